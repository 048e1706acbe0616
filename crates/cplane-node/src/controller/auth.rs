// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static worker-name → secret registry used to authenticate the
//! connect-time `{name, secret}` handshake.

use std::collections::HashMap;

#[derive(Default, Clone)]
pub struct WorkerAuthRegistry {
    secrets: HashMap<String, String>,
}

impl WorkerAuthRegistry {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn verify(&self, name: &str, secret: &str) -> bool {
        self.secrets.get(name).map(|s| s.as_str()) == Some(secret)
    }
}
