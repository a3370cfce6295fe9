//! Wallet connection status as a dashboard renders it.
//!
//! [`derive`] is a pure function of the wallet contexts and the transaction
//! store. Callers re-run it whenever one of them changes, or let [`subscribe`]
//! do that for them.

use {
    super::transaction::TransactionStore,
    alloy::primitives::Address,
    serde::Serialize,
    std::{collections::BTreeSet, sync::Arc},
    tokio::sync::watch,
};

/// How the primary wallet context is connected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connector {
    /// A wallet that holds the user's key, e.g. a browser extension or a local
    /// signer.
    #[default]
    Injected,
    /// Read-only network connection.
    Network,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletError {
    UnsupportedChainId(u64),
    Other(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimaryContext {
    pub chain_id: Option<u64>,
    pub active: bool,
    pub connector: Connector,
    pub error: Option<WalletError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InjectedContext {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupContext {
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    pub primary: PrimaryContext,
    pub injected: InjectedContext,
    pub backup: BackupContext,
    pub supported_chains: BTreeSet<u64>,
}

impl Inputs {
    fn is_supported(&self, chain_id: Option<u64>) -> bool {
        chain_id.is_some_and(|id| self.supported_chains.contains(&id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnsupportedChain,
    Generic,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Status {
    WrongNetwork,
    Connected {
        account: Address,
        pending_count: usize,
        confirmed_count: usize,
        /// Whether the account is shown with an identicon.
        identicon: bool,
    },
    Errored {
        kind: ErrorKind,
    },
    /// Nothing connected yet; prompt the user to connect.
    Disconnected,
}

impl Status {
    pub fn has_pending_transactions(&self) -> bool {
        matches!(self, Self::Connected { pending_count, .. } if *pending_count > 0)
    }

    /// Text shown for this status.
    pub fn label(&self) -> String {
        match self {
            Self::WrongNetwork
            | Self::Errored {
                kind: ErrorKind::UnsupportedChain,
            } => "Wrong Network".to_string(),
            Self::Connected { account, .. } => shorten_address(account),
            Self::Errored {
                kind: ErrorKind::Generic,
            } => "Error".to_string(),
            Self::Disconnected => "Connect Wallet".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no chain ID specified")]
pub struct MissingChainId;

/// Derives the connection status. `Ok(None)` means nothing is rendered at all
/// because neither the primary nor the backup context reaches a chain.
pub fn derive(
    inputs: &Inputs,
    store: &dyn TransactionStore,
) -> Result<Option<Status>, MissingChainId> {
    if inputs.primary.chain_id.is_none() {
        return Err(MissingChainId);
    }
    if !inputs.primary.active && !inputs.backup.active {
        return Ok(None);
    }

    let supported = inputs.is_supported(inputs.injected.chain_id);
    let status = match (&inputs.injected.account, &inputs.primary.error) {
        (Some(_), _) if !supported => Status::WrongNetwork,
        (Some(account), _) => Status::Connected {
            account: *account,
            pending_count: store.pending_transactions(*account).len(),
            confirmed_count: store.confirmed_transactions(*account).len(),
            identicon: inputs.primary.connector == Connector::Injected,
        },
        (None, Some(WalletError::UnsupportedChainId(_))) => Status::Errored {
            kind: ErrorKind::UnsupportedChain,
        },
        (None, Some(WalletError::Other(_))) => Status::Errored {
            kind: ErrorKind::Generic,
        },
        (None, None) => Status::Disconnected,
    };
    tracing::debug!(
        account = ?inputs.injected.account,
        supported,
        error = ?inputs.primary.error,
        ?status,
        "derived connection status"
    );
    Ok(Some(status))
}

/// Shortens an address to its first four and last four hex digits, e.g.
/// `0x1234...abcd`.
pub fn shorten_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub type Derived = Result<Option<Status>, MissingChainId>;

/// Keeps a derived status up to date. The status is re-derived whenever the
/// inputs change or the store reports a new revision. The task stops once all
/// receivers are dropped or either input channel is closed.
pub fn subscribe(
    mut inputs: watch::Receiver<Inputs>,
    mut revisions: watch::Receiver<u64>,
    store: Arc<dyn TransactionStore>,
) -> watch::Receiver<Derived> {
    let (sender, receiver) = watch::channel(derive(&inputs.borrow_and_update(), store.as_ref()));
    revisions.mark_unchanged();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = inputs.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sender.closed() => break,
            }
            let derived = derive(&inputs.borrow_and_update(), store.as_ref());
            revisions.mark_unchanged();
            sender.send_if_modified(|current| {
                let modified = *current != derived;
                *current = derived;
                modified
            });
        }
    });

    receiver
}
