//! Contract interfaces and conversions between ethers and alloy primitives

use alloy_sol_types::sol;
use ethers::types::{Address, U256};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256 balance);
    }

    /// Apriori liquid staking vault
    interface IApriori {
        function deposit(uint256 assets, address receiver) external payable returns (uint256 shares);
    }

    /// Kintsu staking pool, also the sMON share token
    interface IKintsu {
        function stake() external payable returns (uint96 shares);
        function requestUnlock(uint96 shares) external returns (uint96 spotValue);
    }

    /// Magic Eden public mint
    interface IMagicEdenMint {
        function mintPublic(address to, uint256 tokenId, uint256 qty, bytes data) external payable;
    }
}

pub fn to_alloy_address(address: Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(address.0)
}

pub fn to_alloy_u256(value: U256) -> alloy_primitives::U256 {
    alloy_primitives::U256::from_limbs(value.0)
}

pub fn from_alloy_u256(value: alloy_primitives::U256) -> U256 {
    U256(value.into_limbs())
}
