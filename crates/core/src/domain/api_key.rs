// API keys: opaque 128-bit tokens carrying capability flags.

use serde::{Deserialize, Serialize};

/// Longest key name the store accepts.
pub const MAX_KEY_NAME_LEN: usize = 16;

/// The three independent capabilities a key may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Jury,
    Reader,
    Master,
}

/// An issued key. Keys are append-only from the coordinator's perspective;
/// only the operator CLI creates them (plus the jury keys the autoscaler
/// mints for new instances).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub active: bool,
    pub name: Option<String>,
    pub key: String,
    pub perm_jury: bool,
    pub perm_reader: bool,
    pub perm_master: bool,
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub name: Option<String>,
    pub key: String,
    pub perm_jury: bool,
    pub perm_reader: bool,
    pub perm_master: bool,
}

impl ApiKey {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Jury => self.perm_jury,
            Capability::Reader => self.perm_reader,
            Capability::Master => self.perm_master,
        }
    }

    /// The guard check used by every endpoint: the key must be active and
    /// hold at least one of the listed capabilities.
    pub fn allows_any(&self, capabilities: &[Capability]) -> bool {
        self.active && capabilities.iter().any(|c| self.allows(*c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(jury: bool, reader: bool, master: bool, active: bool) -> ApiKey {
        ApiKey {
            id: 1,
            active,
            name: None,
            key: "aa".repeat(16),
            perm_jury: jury,
            perm_reader: reader,
            perm_master: master,
        }
    }

    #[test]
    fn any_of_check() {
        let jury = key(true, false, false, true);
        assert!(jury.allows_any(&[Capability::Jury]));
        assert!(jury.allows_any(&[Capability::Jury, Capability::Reader]));
        assert!(!jury.allows_any(&[Capability::Reader]));
        assert!(!jury.allows_any(&[Capability::Master]));
    }

    #[test]
    fn inactive_key_allows_nothing() {
        let revoked = key(true, true, true, false);
        assert!(!revoked.allows_any(&[Capability::Jury]));
        assert!(!revoked.allows_any(&[Capability::Master]));
    }
}
