use {
    crate::{
        domain::{
            pool::Swap,
            status::{
                self,
                BackupContext,
                Connector,
                InjectedContext,
                Inputs,
                PrimaryContext,
                WalletError,
            },
        },
        infra::{
            InMemoryTransactionStore,
            Operator,
            PairLocks,
            Pool,
            cli::{Cli, Command, StatusArgs, SwapArgs, TokenArgs},
        },
    },
    alloy::{primitives::Address, signers::local::PrivateKeySigner},
    anyhow::{Context, Result},
    clap::Parser,
    ethrpc::Blockchain,
    serde::Serialize,
    std::{collections::BTreeSet, sync::Arc, time::Duration},
    tokio::sync::watch,
    tracing::Instrument,
};

pub async fn start(args: impl IntoIterator<Item = String>) {
    let cli = Cli::parse_from(args);
    observe::tracing::initialize(&cli.args.log_filter, cli.args.use_json_logs);
    tracing::info!("running pool console with validated arguments:\n{}", cli.args);

    match run(cli).await {
        Ok(true) => (),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            tracing::error!(?err, "pool console failed");
            std::process::exit(1);
        }
    }
}

/// Executes the command and prints its result. Returns whether the command
/// succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let Cli { args, command } = cli;
    let signer: PrivateKeySigner = args
        .private_key
        .parse()
        .context("invalid private key")?;
    let web3 = Arc::new(ethrpc::Web3::new(
        args.node_url.clone(),
        signer,
        args.rpc_timeout,
    ));
    let account = web3.account();
    let store = Arc::new(InMemoryTransactionStore::new());
    let operator = Operator::new(
        Pool::new(web3.clone()),
        store.clone(),
        PairLocks::default(),
        account,
    );
    let pool = Pool::new(web3.clone());

    let span = tracing::info_span!("command", pool = ?args.pool, ?account);
    async move {
        match command {
            Command::Params => {
                let envelope = pool.params(args.pool).await?;
                print(&envelope)?;
                Ok(envelope.is_success())
            }
            Command::Tokens => print_envelope(&pool.token_params(args.pool).await),
            Command::Bind(TokenArgs {
                token,
                balance,
                weight,
            }) => print_envelope(&operator.bind(args.pool, token, balance, weight).await),
            Command::SetParams(TokenArgs {
                token,
                balance,
                weight,
            }) => print_envelope(&operator.set_params(args.pool, token, balance, weight).await),
            Command::Swap(SwapArgs {
                token_in,
                amount_in,
                token_out,
                min_amount_out,
                max_price,
            }) => {
                let swap = Swap {
                    token_in,
                    amount_in,
                    token_out,
                    min_amount_out,
                    max_price,
                };
                print_envelope(&operator.swap_exact_amount_in(args.pool, swap).await)
            }
            Command::Status(StatusArgs { follow }) => {
                let supported: BTreeSet<u64> = args.supported_chain_ids.iter().copied().collect();
                let inputs = wallet_inputs(account, web3.chain_id().await, supported.clone());
                let Some(interval) = follow else {
                    print_status(&status::derive(&inputs, store.as_ref()))?;
                    return Ok(true);
                };

                let (sender, receiver) = watch::channel(inputs);
                let mut derived = status::subscribe(receiver, store.revisions(), store.clone());
                tokio::spawn(poll_wallet(web3.clone(), sender, supported, interval));
                loop {
                    let current = derived.borrow_and_update().clone();
                    print_status(&current)?;
                    if derived.changed().await.is_err() {
                        return Ok(true);
                    }
                }
            }
        }
    }
    .instrument(span)
    .await
}

/// Maps the signer and the node's answer to the wallet contexts the status is
/// derived from. The signer is always available, so the node decides whether
/// anything is reachable at all.
fn wallet_inputs(
    account: Address,
    chain_id: Result<u64, ethrpc::Error>,
    supported_chains: BTreeSet<u64>,
) -> Inputs {
    match chain_id {
        Ok(chain_id) => Inputs {
            primary: PrimaryContext {
                chain_id: Some(chain_id),
                active: true,
                connector: Connector::Injected,
                error: (!supported_chains.contains(&chain_id))
                    .then_some(WalletError::UnsupportedChainId(chain_id)),
            },
            injected: InjectedContext {
                account: Some(account),
                chain_id: Some(chain_id),
            },
            backup: BackupContext { active: true },
            supported_chains,
        },
        Err(err) => {
            tracing::warn!(?err, "node unreachable");
            Inputs {
                primary: PrimaryContext {
                    // Fall back to the default network like a dashboard
                    // without a wallet does.
                    chain_id: supported_chains.first().copied(),
                    active: false,
                    connector: Connector::Injected,
                    error: Some(WalletError::Other(err.to_string())),
                },
                injected: InjectedContext::default(),
                backup: BackupContext { active: false },
                supported_chains,
            }
        }
    }
}

/// Re-reads the node's chain every `interval` and publishes the wallet inputs
/// whenever they change. Stops once nobody listens anymore.
async fn poll_wallet(
    chain: Arc<dyn Blockchain>,
    inputs: watch::Sender<Inputs>,
    supported_chains: BTreeSet<u64>,
    interval: Duration,
) {
    let account = chain.account();
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and the caller already has the
    // current inputs.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = inputs.closed() => break,
        }
        let next = wallet_inputs(account, chain.chain_id().await, supported_chains.clone());
        inputs.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn print_status(derived: &status::Derived) -> Result<()> {
    let derived = derived.clone()?;
    let label = derived.as_ref().map(status::Status::label);
    print(&serde_json::json!({
        "status": derived,
        "label": label,
    }))
}

fn print_envelope<T: Serialize, E: Serialize>(
    envelope: &crate::domain::Envelope<T, E>,
) -> Result<bool> {
    print(envelope)?;
    Ok(envelope.is_success())
}

fn print(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::status::{ErrorKind, Status},
        ethrpc::MockBlockchain,
        maplit::btreeset,
    };

    const ACCOUNT: Address = Address::repeat_byte(0xac);

    #[test]
    fn supported_chain_is_connected() {
        let inputs = wallet_inputs(ACCOUNT, Ok(1), btreeset! {1});
        let status = status::derive(&inputs, &InMemoryTransactionStore::new())
            .unwrap()
            .unwrap();
        let Status::Connected {
            account,
            pending_count,
            ..
        } = status
        else {
            panic!("expected connected status, got {status:?}");
        };
        assert_eq!(account, ACCOUNT);
        assert_eq!(pending_count, 0);
    }

    #[test]
    fn unsupported_chain_is_wrong_network() {
        let inputs = wallet_inputs(ACCOUNT, Ok(9999), btreeset! {1});
        assert_eq!(
            inputs.primary.error,
            Some(WalletError::UnsupportedChainId(9999))
        );
        let status = status::derive(&inputs, &InMemoryTransactionStore::new()).unwrap();
        assert_eq!(status, Some(Status::WrongNetwork));
    }

    #[test]
    fn unreachable_node_renders_nothing() {
        let inputs = wallet_inputs(
            ACCOUNT,
            Err(ethrpc::Error::Timeout(Duration::from_secs(1))),
            btreeset! {1},
        );
        assert_eq!(inputs.primary.chain_id, Some(1));
        let status = status::derive(&inputs, &InMemoryTransactionStore::new()).unwrap();
        assert_eq!(status, None);

        // Only the backup context keeps an error visible.
        let mut inputs = inputs;
        inputs.backup.active = true;
        let status = status::derive(&inputs, &InMemoryTransactionStore::new()).unwrap();
        assert_eq!(
            status,
            Some(Status::Errored {
                kind: ErrorKind::Generic
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn polling_publishes_chain_switch() {
        let mut chain = MockBlockchain::new();
        chain.expect_account().return_const(ACCOUNT);
        chain.expect_chain_id().returning(|| Ok(9999));

        let (sender, mut inputs) = watch::channel(wallet_inputs(ACCOUNT, Ok(1), btreeset! {1}));
        tokio::spawn(poll_wallet(
            Arc::new(chain),
            sender,
            btreeset! {1},
            Duration::from_secs(5),
        ));

        inputs.changed().await.unwrap();
        let inputs = inputs.borrow_and_update().clone();
        assert_eq!(inputs.injected.chain_id, Some(9999));
        assert_eq!(
            inputs.primary.error,
            Some(WalletError::UnsupportedChainId(9999))
        );
    }
}
