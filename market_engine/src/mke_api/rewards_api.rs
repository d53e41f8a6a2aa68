use std::fmt::Debug;

use log::error;

use crate::{
    db_types::{NewRewardTier, NewRewardsConfig, PointsLedgerEntry, RewardTier, RewardsConfig},
    traits::{MarketplaceError, RewardsManagement},
};

/// The `RewardsApi` manages seller loyalty policies and answers balance queries.
///
/// Accrual itself is not here — it belongs to the checkout and payment-approval
/// transactions. This API is the configuration and reporting surface.
pub struct RewardsApi<B> {
    db: B,
}

impl<B: Debug> Debug for RewardsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RewardsApi ({:?})", self.db)
    }
}

impl<B> RewardsApi<B>
where B: RewardsManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates or replaces the seller's rewards configuration.
    pub async fn set_config(&self, config: NewRewardsConfig) -> Result<RewardsConfig, MarketplaceError> {
        self.db.upsert_rewards_config(config).await
    }

    /// Replaces the seller's tier table wholesale. Orders accrued from here on use the new
    /// tiers; already-written ledger entries are untouched.
    pub async fn set_tiers(
        &self,
        seller_id: &str,
        tiers: Vec<NewRewardTier>,
    ) -> Result<Vec<RewardTier>, MarketplaceError> {
        self.db.replace_reward_tiers(seller_id, tiers).await
    }

    pub async fn config(&self, seller_id: &str) -> Result<Option<RewardsConfig>, MarketplaceError> {
        self.db.fetch_rewards_config(seller_id).await
    }

    pub async fn tiers(&self, seller_id: &str) -> Result<Vec<RewardTier>, MarketplaceError> {
        self.db.reward_tiers(seller_id).await
    }

    /// The pair's running balance.
    pub async fn balance(&self, buyer_id: &str, seller_id: &str) -> Result<i64, MarketplaceError> {
        self.db.points_balance(buyer_id, seller_id).await
    }

    /// The pair's full earning history, oldest first.
    pub async fn history(&self, buyer_id: &str, seller_id: &str) -> Result<Vec<PointsLedgerEntry>, MarketplaceError> {
        self.db.ledger_entries(buyer_id, seller_id).await
    }

    /// Recomputes the pair's balance from the ledger and checks it against the denormalized
    /// total. A mismatch is a bug somewhere in accrual and comes back as
    /// [`MarketplaceError::ConsistencyViolation`].
    pub async fn audit_balance(&self, buyer_id: &str, seller_id: &str) -> Result<i64, MarketplaceError> {
        let entries = self.db.ledger_entries(buyer_id, seller_id).await?;
        let expected: i64 = entries.iter().map(|e| e.points_earned).sum();
        let actual = self.db.points_balance(buyer_id, seller_id).await?;
        if expected != actual {
            error!(
                "🎁️ Points balance for buyer {buyer_id} at seller {seller_id} is {actual}, but the ledger sums to \
                 {expected}"
            );
            return Err(MarketplaceError::ConsistencyViolation(format!(
                "points balance {actual} != ledger sum {expected} for ({buyer_id}, {seller_id})"
            )));
        }
        Ok(actual)
    }
}
