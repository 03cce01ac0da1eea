//! Solidity interfaces of the Livepeer contracts the auditor reads.

use alloy_primitives::Bytes;
use alloy_sol_types::{sol, SolCall};

use crate::errors::LookupError;

sol! {
    #![sol(all_derives)]

    interface IBondingManager {
        function getDelegator(address delegator)
            external
            view
            returns (
                uint256 bondedAmount,
                uint256 fees,
                address delegateAddress,
                uint256 delegatedAmount,
                uint256 startRound,
                uint256 lastClaimRound,
                uint256 nextUnbondingLockId
            );

        /// `0` NotRegistered, `1` Registered.
        function transcoderStatus(address transcoder) external view returns (uint8 status);

        function pendingStake(address delegator, uint256 endRound)
            external
            view
            returns (uint256 stake);
    }

    interface IRoundsManager {
        function currentRound() external view returns (uint256 round);
    }

    interface IPoll {
        function endBlock() external view returns (uint256 blockNumber);
    }
}

pub fn encode<C: SolCall>(call: &C) -> Bytes {
    Bytes::from(call.abi_encode())
}

/// Decode `C`'s return data, rejecting short data and dirty padding.
pub fn decode<C: SolCall>(data: &[u8]) -> Result<C::Return, LookupError> {
    C::abi_decode_returns(data, true).map_err(|err| {
        LookupError::Malformed(format!(
            "{} returned {} bytes: {err}",
            C::SIGNATURE,
            data.len()
        ))
    })
}
