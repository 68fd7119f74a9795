//! # Auction Registry
//!
//! One auction per launched asset. The registry owns every engine, creates
//! them on pool initialization and routes callbacks by asset.

use std::collections::BTreeMap;

use crate::config::AuctionConfig;
use crate::errors::{AuctionError, AuctionResult};
use crate::events::AuctionEvent;
use crate::hook::{AuctionEngine, BeforeTrade, Finalization, PoolHook};
use crate::lifecycle::{LifecycleStatus, Snapshot};
use crate::slugs::RebalancePlan;
use crate::state::TradeReceipt;
use crate::types::{Address, AssetId, Authorities};

/// Owning map from asset to its auction
#[derive(Debug)]
pub struct AuctionRegistry {
    authorities: Authorities,
    auctions: BTreeMap<AssetId, AuctionEngine>,
}

impl AuctionRegistry {
    pub fn new(authorities: Authorities) -> Self {
        Self {
            authorities,
            auctions: BTreeMap::new(),
        }
    }

    pub fn authorities(&self) -> &Authorities {
        &self.authorities
    }

    /// Create the auction for `asset` and seed its epoch 0 slugs
    pub fn on_initialize(&mut self, caller: &Address, asset: AssetId, config: AuctionConfig) -> AuctionResult<RebalancePlan> {
        self.authorize_pool(caller)?;
        let engine = AuctionEngine::new(config, self.authorities)?;
        self.on_initialize_with(caller, asset, engine)
    }

    /// Like `on_initialize`, with an engine carrying custom policies
    pub fn on_initialize_with(
        &mut self,
        caller: &Address,
        asset: AssetId,
        mut engine: AuctionEngine,
    ) -> AuctionResult<RebalancePlan> {
        self.authorize_pool(caller)?;
        if self.auctions.contains_key(&asset) {
            log::warn!("Auction for {} already initialized", asset);
            return Err(AuctionError::AlreadyInitialized);
        }
        if *engine.authorities() != self.authorities {
            return Err(AuctionError::NotPoolManager);
        }
        let plan = engine.on_initialize(caller)?;
        self.auctions.insert(asset, engine);
        Ok(plan)
    }

    pub fn on_before_trade(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        current_tick: i32,
        elapsed: i64,
    ) -> AuctionResult<BeforeTrade> {
        self.authorize_pool(caller)?;
        self.engine_mut(asset)?.on_before_trade(caller, current_tick, elapsed)
    }

    pub fn on_after_trade(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        realized_tick: i32,
        receipt: &TradeReceipt,
        elapsed: i64,
    ) -> AuctionResult<()> {
        self.authorize_pool(caller)?;
        self.engine_mut(asset)?
            .on_after_trade(caller, realized_tick, receipt, elapsed)
    }

    pub fn on_trade_aborted(&mut self, caller: &Address, asset: &AssetId) -> AuctionResult<()> {
        self.authorize_pool(caller)?;
        self.engine_mut(asset)?.on_trade_aborted(caller)
    }

    pub fn settle(&mut self, caller: &Address, asset: &AssetId, elapsed: i64) -> AuctionResult<Option<Finalization>> {
        self.engine_mut(asset)?.settle(caller, elapsed)
    }

    pub fn finalize(&mut self, caller: &Address, asset: &AssetId) -> AuctionResult<Snapshot> {
        if *caller != self.authorities.migrator {
            return Err(AuctionError::NotMigrator);
        }
        self.engine_mut(asset)?.finalize(caller)
    }

    /// Status of `asset`; unknown assets are `Uninitialized`
    pub fn status(&self, asset: &AssetId) -> LifecycleStatus {
        self.auctions
            .get(asset)
            .map(AuctionEngine::status)
            .unwrap_or_default()
    }

    pub fn engine(&self, asset: &AssetId) -> AuctionResult<&AuctionEngine> {
        self.auctions.get(asset).ok_or(AuctionError::NotInitialized)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.auctions.keys()
    }

    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    /// Drain the events of every auction, grouped by asset
    pub fn drain_events(&mut self) -> Vec<(AssetId, AuctionEvent)> {
        self.auctions
            .iter_mut()
            .flat_map(|(asset, engine)| {
                let asset = *asset;
                engine.drain_events().into_iter().map(move |event| (asset, event))
            })
            .collect()
    }

    fn engine_mut(&mut self, asset: &AssetId) -> AuctionResult<&mut AuctionEngine> {
        self.auctions.get_mut(asset).ok_or(AuctionError::NotInitialized)
    }

    fn authorize_pool(&self, caller: &Address) -> AuctionResult<()> {
        if *caller != self.authorities.pool_manager {
            return Err(AuctionError::NotPoolManager);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: Address = Address::from_tag(1);
    const MIGRATOR: Address = Address::from_tag(2);

    fn registry() -> AuctionRegistry {
        AuctionRegistry::new(Authorities {
            pool_manager: POOL,
            migrator: MIGRATOR,
        })
    }

    #[test]
    fn test_one_auction_per_asset() {
        let mut registry = registry();
        let asset = AssetId::from_tag(7);
        assert_eq!(registry.status(&asset), LifecycleStatus::Uninitialized);

        let plan = registry.on_initialize(&POOL, asset, AuctionConfig::default()).unwrap();
        assert!(!plan.deposit.is_empty());
        assert_eq!(registry.status(&asset), LifecycleStatus::Initialized);
        assert_eq!(
            registry.on_initialize(&POOL, asset, AuctionConfig::default()).unwrap_err(),
            AuctionError::AlreadyInitialized
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_routing_and_authorization() {
        let mut registry = registry();
        let asset = AssetId::from_tag(7);
        let unknown = AssetId::from_tag(8);

        assert_eq!(
            registry.on_initialize(&MIGRATOR, asset, AuctionConfig::default()).unwrap_err(),
            AuctionError::NotPoolManager
        );
        registry.on_initialize(&POOL, asset, AuctionConfig::default()).unwrap();

        assert_eq!(registry.on_before_trade(&POOL, &unknown, 0, 0).unwrap_err(), AuctionError::NotInitialized);
        assert_eq!(registry.on_before_trade(&MIGRATOR, &asset, 0, 0).unwrap_err(), AuctionError::NotPoolManager);
        assert_eq!(registry.finalize(&POOL, &asset).unwrap_err(), AuctionError::NotMigrator);
        assert_eq!(registry.finalize(&MIGRATOR, &asset).unwrap_err(), AuctionError::NotFinalized);

        let events = registry.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, asset);
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let mut registry = registry();
        let config = AuctionConfig {
            duration: 1_000,
            ..AuctionConfig::default()
        };
        assert_eq!(
            registry.on_initialize(&POOL, AssetId::from_tag(1), config).unwrap_err(),
            AuctionError::DurationNotMultipleOfEpoch
        );
        assert!(registry.is_empty());
    }
}
