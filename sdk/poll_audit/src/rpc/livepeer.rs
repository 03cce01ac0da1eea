//! [`ChainReader`] over the Livepeer protocol contracts.
//!
//! | Lookup                   | Contract call(s)                                          |
//! |--------------------------|-----------------------------------------------------------|
//! | `poll_end_block`         | `Poll.endBlock()` at `latest`                             |
//! | `is_registered_delegate` | `BondingManager.transcoderStatus(a) == Registered`        |
//! | `delegation_fact`        | `BondingManager.getDelegator(a)`                          |
//! | `delegate_total_stake`   | `BondingManager.getDelegator(a).delegatedAmount`          |
//! | `voter_pending_stake`    | `RoundsManager.currentRound()`, then `pendingStake(a, r)` |

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::abi::{self, IBondingManager, IPoll, IRoundsManager};
use super::{EthTransport, JsonRpcClient};
use crate::errors::LookupError;
use crate::reader::ChainReader;
use crate::types::{BlockNumber, DelegationFact, Stake};

/// `TranscoderStatus.Registered` in the BondingManager enum.
const STATUS_REGISTERED: u8 = 1;

/// Deployed protocol contract addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivepeerContracts {
    pub bonding_manager: Address,
    pub rounds_manager: Address,
}

pub struct LivepeerChain<T = JsonRpcClient> {
    rpc: T,
    contracts: LivepeerContracts,
}

impl<T: EthTransport> LivepeerChain<T> {
    pub fn new(rpc: T, contracts: LivepeerContracts) -> Self {
        Self { rpc, contracts }
    }

    async fn view<C>(
        &self,
        to: Address,
        call: C,
        at: Option<BlockNumber>,
    ) -> Result<C::Return, LookupError>
    where
        C: SolCall + Send + Sync,
    {
        let raw = self.rpc.call(to, abi::encode(&call), at).await?;
        abi::decode::<C>(&raw)
    }

    async fn get_delegator(
        &self,
        account: Address,
        at: BlockNumber,
    ) -> Result<IBondingManager::getDelegatorReturn, LookupError> {
        self.view(
            self.contracts.bonding_manager,
            IBondingManager::getDelegatorCall { delegator: account },
            Some(at),
        )
        .await
    }

    async fn current_round(&self, at: BlockNumber) -> Result<U256, LookupError> {
        let ret = self
            .view(
                self.contracts.rounds_manager,
                IRoundsManager::currentRoundCall {},
                Some(at),
            )
            .await?;
        Ok(ret.round)
    }
}

#[async_trait]
impl<T: EthTransport> ChainReader for LivepeerChain<T> {
    async fn current_block_height(&self) -> Result<BlockNumber, LookupError> {
        self.rpc.block_number().await
    }

    async fn poll_end_block(&self, poll: Address) -> Result<BlockNumber, LookupError> {
        let end = self.view(poll, IPoll::endBlockCall {}, None).await?.blockNumber;
        u64::try_from(end)
            .map_err(|_| LookupError::Malformed(format!("end block {end} does not fit in u64")))
    }

    async fn delegate_total_stake(
        &self,
        delegate: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError> {
        Ok(self.get_delegator(delegate, at).await?.delegatedAmount)
    }

    async fn voter_pending_stake(
        &self,
        voter: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError> {
        let round = self.current_round(at).await?;
        debug!(%voter, %round, at, "pending stake lookup");
        let ret = self
            .view(
                self.contracts.bonding_manager,
                IBondingManager::pendingStakeCall {
                    delegator: voter,
                    endRound: round,
                },
                Some(at),
            )
            .await?;
        Ok(ret.stake)
    }

    async fn is_registered_delegate(
        &self,
        account: Address,
        at: BlockNumber,
    ) -> Result<bool, LookupError> {
        let ret = self
            .view(
                self.contracts.bonding_manager,
                IBondingManager::transcoderStatusCall { transcoder: account },
                Some(at),
            )
            .await?;
        Ok(ret.status == STATUS_REGISTERED)
    }

    async fn delegation_fact(
        &self,
        delegator: Address,
        at: BlockNumber,
    ) -> Result<DelegationFact, LookupError> {
        let ret = self.get_delegator(delegator, at).await?;
        Ok(DelegationFact {
            delegator,
            delegate: ret.delegateAddress,
            delegated_amount: ret.delegatedAmount,
        })
    }
}
