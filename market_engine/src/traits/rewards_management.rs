use crate::{
    db_types::{NewRewardTier, NewRewardsConfig, PointsLedgerEntry, RewardTier, RewardsConfig},
    traits::MarketplaceError,
};

/// Rewards policy administration and balance queries.
///
/// The policy (config + tiers) is written by the seller's configuration surface and read by
/// accrual at accrual time. Balances are derived: the points ledger is the source of truth.
#[allow(async_fn_in_trait)]
pub trait RewardsManagement: Clone {
    /// Creates or replaces the seller's rewards configuration.
    async fn upsert_rewards_config(&self, config: NewRewardsConfig) -> Result<RewardsConfig, MarketplaceError>;

    /// Replaces the seller's tier table wholesale.
    async fn replace_reward_tiers(
        &self,
        seller_id: &str,
        tiers: Vec<NewRewardTier>,
    ) -> Result<Vec<RewardTier>, MarketplaceError>;

    async fn fetch_rewards_config(&self, seller_id: &str) -> Result<Option<RewardsConfig>, MarketplaceError>;

    /// The seller's tiers, ordered by ascending threshold.
    async fn reward_tiers(&self, seller_id: &str) -> Result<Vec<RewardTier>, MarketplaceError>;

    /// The denormalized running balance for the pair. 0 when the pair has never earned.
    async fn points_balance(&self, buyer_id: &str, seller_id: &str) -> Result<i64, MarketplaceError>;

    /// Every ledger entry for the pair, oldest first.
    async fn ledger_entries(
        &self,
        buyer_id: &str,
        seller_id: &str,
    ) -> Result<Vec<PointsLedgerEntry>, MarketplaceError>;
}
