//! Solidity bindings for the Balancer pool and the ERC20 test tokens bound
//! into it.
//!
//! Only the parts of the ABIs that the console touches are declared. Calls
//! are encoded and decoded with [`alloy::sol_types::SolCall`] and submitted
//! through whatever transport the caller owns.

use alloy::primitives::B256;

alloy::sol! {
    /// Early ("bronze") Balancer pool.
    #[sol(all_derives)]
    contract BPool {
        /// Emitted by every logged pool method. `sig` is the selector of the
        /// call and `data` the complete calldata.
        event LOG_CALL(bytes4 indexed sig, address indexed caller, bytes data) anonymous;

        function getManager() external view returns (address);
        function getFee() external view returns (uint256);
        function getNumTokens() external view returns (uint256);
        function isPaused() external view returns (bool);

        function bind(address token, uint256 balance, uint256 weight) external;
        function setParams(address token, uint256 balance, uint256 weight) external;

        function swap_ExactAmountIn(
            address tokenIn,
            uint256 amountIn,
            address tokenOut,
            uint256 minAmountOut,
            uint256 maxPrice
        ) external returns (uint256 amountOut, uint256 priceAfter);
    }

    /// ERC20 token used for pool liquidity.
    #[sol(all_derives)]
    contract TestToken {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Topic under which the anonymous `LOG_CALL` event is indexed for calls with
/// the given selector: the selector left-aligned in a zeroed 32 byte word.
pub fn log_call_topic(selector: [u8; 4]) -> B256 {
    let mut topic = B256::ZERO;
    topic.0[..4].copy_from_slice(&selector);
    topic
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{Address, U256},
            sol_types::SolCall,
        },
        hex_literal::hex,
    };

    #[test]
    fn selectors() {
        assert_eq!(BPool::bindCall::SELECTOR, hex!("e4e1e538"));
        assert_eq!(BPool::setParamsCall::SELECTOR, hex!("7ff10552"));
        assert_eq!(TestToken::approveCall::SELECTOR, hex!("095ea7b3"));
        assert_eq!(TestToken::balanceOfCall::SELECTOR, hex!("70a08231"));
    }

    #[test]
    fn bind_topic_matches_padded_signature() {
        assert_eq!(
            log_call_topic(BPool::bindCall::SELECTOR),
            B256::from(hex!(
                "e4e1e53800000000000000000000000000000000000000000000000000000000"
            )),
        );
        assert_eq!(
            log_call_topic(BPool::setParamsCall::SELECTOR),
            B256::from(hex!(
                "7ff1055200000000000000000000000000000000000000000000000000000000"
            )),
        );
    }

    #[test]
    fn bind_calldata_keeps_large_amounts() {
        let call = BPool::bindCall {
            token: Address::repeat_byte(0x11),
            balance: "123456789012345678901234567890".parse().unwrap(),
            weight: U256::from(10).pow(U256::from(18)),
        };
        let decoded = BPool::bindCall::abi_decode(&call.abi_encode()).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(decoded.balance.to_string(), "123456789012345678901234567890");
    }
}
