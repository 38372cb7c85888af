use serde::Serialize;
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;

/// The parts of on-chain account state the reclaim pipeline looks at.
/// Absence on-chain is modelled as `Option::None` by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteAccount {
    pub lamports: u64,
    pub data_len: usize,
    #[serde(serialize_with = "serialize_pubkey")]
    pub owner: Pubkey,
}

impl RemoteAccount {
    pub fn new(lamports: u64, data_len: usize, owner: Pubkey) -> Self {
        Self {
            lamports,
            data_len,
            owner,
        }
    }

    /// Closed accounts carry no data payload.
    pub fn is_closed(&self) -> bool {
        self.data_len == 0
    }
}

impl From<&Account> for RemoteAccount {
    fn from(account: &Account) -> Self {
        Self {
            lamports: account.lamports,
            data_len: account.data.len(),
            owner: account.owner,
        }
    }
}

impl From<Account> for RemoteAccount {
    fn from(account: Account) -> Self {
        Self::from(&account)
    }
}

fn serialize_pubkey<S: serde::Serializer>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&pubkey.to_string())
}
