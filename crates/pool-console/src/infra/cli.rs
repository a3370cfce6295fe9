//! Command line arguments.

use {
    alloy::primitives::{Address, U256},
    std::{fmt, time::Duration},
    url::Url,
};

#[derive(clap::Parser)]
#[clap(version, about = "Inspect and operate a Balancer pool")]
pub struct Cli {
    #[clap(flatten)]
    pub args: Arguments,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Parser)]
pub struct Arguments {
    /// JSON-RPC endpoint of the node.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Address of the pool contract.
    #[clap(long, env = "POOL_ADDRESS")]
    pub pool: Address,

    /// Hex encoded key of the account that signs transactions.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: String,

    /// Upper bound for every individual node request, including waiting for
    /// a transaction to be included.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub rpc_timeout: Duration,

    /// Chains the pool console considers supported.
    #[clap(long, env, default_value = "1", value_delimiter = ',')]
    pub supported_chain_ids: Vec<u64>,

    #[clap(long, env, default_value = "warn,pool_console=debug,ethrpc=debug")]
    pub log_filter: String,

    #[clap(long, env)]
    pub use_json_logs: bool,
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            node_url,
            pool,
            private_key: _,
            rpc_timeout,
            supported_chain_ids,
            log_filter,
            use_json_logs,
        } = self;

        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "pool: {pool:?}")?;
        writeln!(f, "private_key: SECRET")?;
        writeln!(f, "rpc_timeout: {rpc_timeout:?}")?;
        writeln!(f, "supported_chain_ids: {supported_chain_ids:?}")?;
        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Read the pool's manager, fee, token count and pause flag.
    Params,
    /// Rebuild every bound token's balance and weight.
    Tokens,
    /// Approve and bind a token.
    Bind(TokenArgs),
    /// Approve and update a bound token's balance and weight.
    SetParams(TokenArgs),
    /// Approve and swap an exact input amount.
    Swap(SwapArgs),
    /// Show the wallet connection status of the signing account.
    Status(StatusArgs),
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct TokenArgs {
    #[clap(long)]
    pub token: Address,
    /// Token amount in base units.
    #[clap(long)]
    pub balance: U256,
    /// Denormalized weight in base units.
    #[clap(long)]
    pub weight: U256,
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct SwapArgs {
    #[clap(long)]
    pub token_in: Address,
    #[clap(long)]
    pub amount_in: U256,
    #[clap(long)]
    pub token_out: Address,
    #[clap(long)]
    pub min_amount_out: U256,
    #[clap(long, default_value_t = U256::MAX)]
    pub max_price: U256,
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct StatusArgs {
    /// Keep running and print the status again whenever it changes. The
    /// node's chain is polled at this interval.
    #[clap(long, value_parser = humantime::parse_duration)]
    pub follow: Option<Duration>,
}
