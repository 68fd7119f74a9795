//! # Slug Manager
//!
//! Places the engine-owned liquidity ranges ("slugs") for one epoch:
//!
//! ```text
//!        lower slug          upper slug         price discovery slugs
//!   [anchor - lw, anchor] [anchor, anchor + uw] [top, top + g] [top + g, top + 2g] ...
//!        numeraire             asset                       asset
//! ```
//!
//! The lower slug holds numeraire so early buyers can sell back, the upper
//! slug sells the epoch's allotment, and the price discovery slugs hold a
//! share of the remaining supply above that so demand surges still trade
//! against engine liquidity. Where the anchor sits and how wide the ranges
//! are is a [`BoundsPolicy`].
//!
//! Liquidity is fitted from each budget so the rounded-up amount a range
//! needs never exceeds what the engine owns. Ranges whose liquidity falls
//! below `MIN_LIQUIDITY` are not placed at all.

use std::fmt::Debug;

use ethnum::U256;

use crate::config::AuctionConfig;
use crate::constants::{BPS_DENOMINATOR, MIN_LIQUIDITY, MIN_SQRT_PRICE, MIN_TICK};
use crate::errors::{AuctionError, AuctionResult};
use crate::math::liquidity_math::{amount0_delta, amount1_delta, fit_liquidity_for_amount0, fit_liquidity_for_amount1};
use crate::math::safe_math::{apply_bps, isqrt_u256, safe_add_i32, safe_sub_i32, safe_sub_u128, to_u128};
use crate::math::tick_math::{align_tick, check_tick, sqrt_price_to_tick, tick_to_sqrt_price, Rounding};
use crate::schedule::AuctionSchedule;
use crate::types::TokenAmounts;

// ============================================================================
// Slug Types
// ============================================================================

/// What a slug is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum SlugRole {
    /// Numeraire below the anchor; absorbs sell-backs
    LowerSlug,
    /// Asset above the anchor; the epoch's active sale range
    UpperSlug,
    /// Asset stacked above the upper slug for demand surges
    PriceDiscoverySlug,
}

impl SlugRole {
    /// Name used by plotting and indexing tools
    pub fn name(&self) -> &'static str {
        match self {
            SlugRole::LowerSlug => "lowerSlug",
            SlugRole::UpperSlug => "upperSlug",
            SlugRole::PriceDiscoverySlug => "pdSlug",
        }
    }

    /// Whether the slug is funded with the asset (as opposed to numeraire)
    pub fn holds_asset(&self) -> bool {
        !matches!(self, SlugRole::LowerSlug)
    }
}

/// One engine-owned liquidity range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Slug {
    pub role: SlugRole,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

impl Slug {
    fn new(role: SlugRole, tick_lower: i32, tick_upper: i32, liquidity: u128) -> AuctionResult<Self> {
        check_tick(tick_lower)?;
        check_tick(tick_upper)?;
        if tick_lower >= tick_upper {
            return Err(AuctionError::InvalidTick);
        }
        Ok(Self {
            role,
            tick_lower,
            tick_upper,
            liquidity,
        })
    }

    /// Token amounts backing the slug while the price sits on its funded side
    ///
    /// Asset slugs are priced at or below their lower bound, the lower slug at
    /// or above its upper bound, so each is single-sided.
    pub fn reserves(&self, rounding: Rounding) -> AuctionResult<TokenAmounts> {
        let sqrt_lower = tick_to_sqrt_price(self.tick_lower)?;
        let sqrt_upper = tick_to_sqrt_price(self.tick_upper)?;
        if self.role.holds_asset() {
            Ok(TokenAmounts {
                asset: amount0_delta(sqrt_lower, sqrt_upper, self.liquidity, rounding)?,
                numeraire: 0,
            })
        } else {
            Ok(TokenAmounts {
                asset: 0,
                numeraire: amount1_delta(sqrt_lower, sqrt_upper, self.liquidity, rounding)?,
            })
        }
    }

    /// Token amounts the slug holds with the pool at `sqrt_price`
    pub fn reserves_at(&self, sqrt_price: u128, rounding: Rounding) -> AuctionResult<TokenAmounts> {
        let sqrt_lower = tick_to_sqrt_price(self.tick_lower)?;
        let sqrt_upper = tick_to_sqrt_price(self.tick_upper)?;
        let price = sqrt_price.clamp(sqrt_lower, sqrt_upper);
        let asset = if price < sqrt_upper {
            amount0_delta(price, sqrt_upper, self.liquidity, rounding)?
        } else {
            0
        };
        let numeraire = if price > sqrt_lower {
            amount1_delta(sqrt_lower, price, self.liquidity, rounding)?
        } else {
            0
        };
        Ok(TokenAmounts { asset, numeraire })
    }
}

/// The slugs active during one epoch, in ascending tick order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SlugSet {
    pub lower: Option<Slug>,
    pub upper: Option<Slug>,
    pub price_discovery: Vec<Slug>,
}

impl SlugSet {
    pub fn iter(&self) -> impl Iterator<Item = &Slug> {
        self.lower
            .iter()
            .chain(self.upper.iter())
            .chain(self.price_discovery.iter())
    }

    pub fn to_vec(&self) -> Vec<Slug> {
        self.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none() && self.price_discovery.is_empty()
    }

    /// Ranges never overlap and appear lower, upper, price discovery
    pub fn is_ordered(&self) -> bool {
        let slugs = self.to_vec();
        slugs.iter().all(|slug| slug.tick_lower < slug.tick_upper)
            && slugs.windows(2).all(|pair| pair[0].tick_upper <= pair[1].tick_lower)
    }

    /// Total backing across all slugs
    pub fn reserves(&self, rounding: Rounding) -> AuctionResult<TokenAmounts> {
        self.iter()
            .try_fold(TokenAmounts::ZERO, |total, slug| total.checked_add(slug.reserves(rounding)?))
    }

    pub fn reserves_at(&self, sqrt_price: u128, rounding: Rounding) -> AuctionResult<TokenAmounts> {
        self.iter().try_fold(TokenAmounts::ZERO, |total, slug| {
            total.checked_add(slug.reserves_at(sqrt_price, rounding)?)
        })
    }
}

/// Liquidity changes the pool must apply, in order: withdraw, then deposit,
/// then move the price to `target_tick`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePlan {
    pub withdraw: Vec<Slug>,
    pub deposit: Vec<Slug>,
    pub target_tick: i32,
}

// ============================================================================
// Bounds Policy
// ============================================================================

/// Anchor and widths chosen for an epoch, before alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlugBounds {
    /// Boundary between the lower and upper slug
    pub anchor: i32,
    /// Width of the lower slug in ticks
    pub lower_width: i32,
    /// Width of the upper slug in ticks
    pub upper_width: i32,
}

/// Maps the schedule and accumulated drift to slug bounds
pub trait BoundsPolicy: Debug + Send + Sync {
    fn bounds(&self, expected_tick: i32, drift: i32, config: &AuctionConfig) -> AuctionResult<SlugBounds>;
}

/// Default policy: the anchor follows drift by `follow_bps`.
///
/// Negative drift widens the lower slug toward lower prices; positive drift
/// narrows the upper slug, never below one tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftShift {
    pub follow_bps: u16,
}

impl DriftShift {
    pub fn new(follow_bps: u16) -> Self {
        Self { follow_bps }
    }
}

impl BoundsPolicy for DriftShift {
    fn bounds(&self, expected_tick: i32, drift: i32, config: &AuctionConfig) -> AuctionResult<SlugBounds> {
        let shift = drift as i64 * self.follow_bps as i64 / BPS_DENOMINATOR as i64;
        let anchor = i32::try_from(expected_tick as i64 + shift).map_err(|_| AuctionError::InvalidTick)?;
        let shift = shift as i32;

        let lower_width = if shift < 0 {
            safe_sub_i32(config.gamma, shift)?
        } else {
            config.gamma
        };
        let upper_width = if shift > 0 {
            (config.gamma - shift / 2).max(config.tick_spacing)
        } else {
            config.gamma
        };

        Ok(SlugBounds {
            anchor,
            lower_width,
            upper_width,
        })
    }
}

// ============================================================================
// Slug Manager
// ============================================================================

/// Auction progress the placement depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlugInputs {
    pub epoch: u64,
    pub expected_tick: i32,
    pub drift: i32,
    /// Cumulative asset bought from the engine
    pub tokens_sold: u128,
    /// Asset traders still hold after sell-backs
    pub net_sold: u128,
    pub net_proceeds: u128,
}

/// Result of a placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugLayout {
    /// Aligned anchor; the pool price is moved here
    pub anchor: i32,
    pub slugs: SlugSet,
    /// Rounded-up amounts the slugs need
    pub committed: TokenAmounts,
}

/// Computes the slug layout for an epoch
pub struct SlugManager<'a> {
    config: &'a AuctionConfig,
    schedule: &'a AuctionSchedule,
    policy: &'a dyn BoundsPolicy,
}

impl<'a> SlugManager<'a> {
    pub fn new(config: &'a AuctionConfig, schedule: &'a AuctionSchedule, policy: &'a dyn BoundsPolicy) -> Self {
        Self {
            config,
            schedule,
            policy,
        }
    }

    /// Place every slug for `inputs.epoch`
    pub fn compute(&self, inputs: &SlugInputs) -> AuctionResult<SlugLayout> {
        let bounds = self.policy.bounds(inputs.expected_tick, inputs.drift, self.config)?;
        let spacing = self.config.tick_spacing;
        let anchor = check_tick(align_tick(bounds.anchor, spacing, Rounding::Up))?;
        let lower_width = self.aligned_width(bounds.lower_width)?;
        let upper_width = self.aligned_width(bounds.upper_width)?;

        // Supply never sold; returned tokens are not offered again
        let remaining = safe_sub_u128(self.config.total_tokens, inputs.tokens_sold)?;

        let lower = self.lower_slug(anchor, lower_width, inputs.net_sold, inputs.net_proceeds)?;
        let (upper, upper_amount) =
            self.upper_slug(anchor, upper_width, inputs.epoch, inputs.tokens_sold, remaining)?;
        let pd_base = safe_add_i32(anchor, upper_width)?;
        let price_discovery =
            self.price_discovery_slugs(pd_base, inputs.epoch, safe_sub_u128(remaining, upper_amount)?)?;

        let slugs = SlugSet {
            lower,
            upper,
            price_discovery,
        };
        if !slugs.is_ordered() {
            return Err(AuctionError::InvalidTick);
        }

        // Ledger check: never place more than the engine owns
        let committed = slugs.reserves(Rounding::Up)?;
        if committed.asset > remaining || committed.numeraire > inputs.net_proceeds {
            return Err(AuctionError::LiquidityUnderflow);
        }

        Ok(SlugLayout {
            anchor,
            slugs,
            committed,
        })
    }

    fn aligned_width(&self, width: i32) -> AuctionResult<i32> {
        if width <= 0 {
            return Err(AuctionError::InvalidTick);
        }
        Ok(align_tick(width, self.config.tick_spacing, Rounding::Up))
    }

    fn lower_slug(
        &self,
        anchor: i32,
        width: i32,
        net_sold: u128,
        net_proceeds: u128,
    ) -> AuctionResult<Option<Slug>> {
        if net_sold == 0 || net_proceeds == 0 {
            return Ok(None);
        }

        // Full range: enough numeraire to buy back every net-sold token
        let tick_lower = check_tick(safe_sub_i32(anchor, width)?)?;
        let sqrt_lower = tick_to_sqrt_price(tick_lower)?;
        let sqrt_anchor = tick_to_sqrt_price(anchor)?;
        let liquidity = fit_liquidity_for_amount0(sqrt_lower, sqrt_anchor, net_sold)?;
        let required = amount1_delta(sqrt_lower, sqrt_anchor, liquidity, Rounding::Up)?;
        if required <= net_proceeds {
            return placed(SlugRole::LowerSlug, tick_lower, anchor, liquidity);
        }

        // Not enough proceeds: one spacing just under the average clearing price
        let average = self.average_price_tick(net_sold, net_proceeds, sqrt_anchor)?;
        let spacing = self.config.tick_spacing;
        let lowest = align_tick(MIN_TICK + spacing, spacing, Rounding::Up);
        let tick_upper = align_tick(average, spacing, Rounding::Down).max(lowest).min(anchor);
        let tick_lower = check_tick(safe_sub_i32(tick_upper, spacing)?)?;
        let sqrt_lower = tick_to_sqrt_price(tick_lower)?;
        let sqrt_upper = tick_to_sqrt_price(tick_upper)?;
        let liquidity = fit_liquidity_for_amount1(sqrt_lower, sqrt_upper, net_proceeds)?;
        placed(SlugRole::LowerSlug, tick_lower, tick_upper, liquidity)
    }

    // Tick of proceeds / sold, rounded down (a buyer's ceiling), kept
    // between the lowest legal price and the anchor
    fn average_price_tick(&self, net_sold: u128, net_proceeds: u128, sqrt_anchor: u128) -> AuctionResult<i32> {
        let price_x128 = (U256::from(net_proceeds) << 128) / U256::from(net_sold);
        let sqrt_price = isqrt_u256(price_x128)
            .min(U256::from(sqrt_anchor))
            .max(U256::from(MIN_SQRT_PRICE));
        sqrt_price_to_tick(to_u128(sqrt_price)?, Rounding::Down)
    }

    fn upper_slug(
        &self,
        anchor: i32,
        width: i32,
        epoch: u64,
        tokens_sold: u128,
        remaining: u128,
    ) -> AuctionResult<(Option<Slug>, u128)> {
        let expected = self.schedule.expected_sold(epoch)?;
        let amount = expected.saturating_sub(tokens_sold).min(remaining);
        if amount == 0 {
            return Ok((None, 0));
        }

        let tick_upper = check_tick(safe_add_i32(anchor, width)?)?;
        let liquidity = fit_liquidity_for_amount0(tick_to_sqrt_price(anchor)?, tick_to_sqrt_price(tick_upper)?, amount)?;
        Ok((placed(SlugRole::UpperSlug, anchor, tick_upper, liquidity)?, amount))
    }

    fn price_discovery_slugs(&self, base: i32, epoch: u64, available: u128) -> AuctionResult<Vec<Slug>> {
        let budgets = self.price_discovery_budgets(epoch, available)?;
        let gamma = self.config.gamma;

        let mut slugs = Vec::with_capacity(budgets.len());
        let mut tick_lower = base;
        for amount in budgets {
            let tick_upper = check_tick(safe_add_i32(tick_lower, gamma)?)?;
            if amount > 0 {
                let liquidity = fit_liquidity_for_amount0(
                    tick_to_sqrt_price(tick_lower)?,
                    tick_to_sqrt_price(tick_upper)?,
                    amount,
                )?;
                if let Some(slug) = placed(SlugRole::PriceDiscoverySlug, tick_lower, tick_upper, liquidity)? {
                    slugs.push(slug);
                }
            }
            tick_lower = tick_upper;
        }
        Ok(slugs)
    }

    /// Asset budget of each price discovery range, bottom first. One range per
    /// epoch still to come, at most `num_pd_slugs`; the last takes the remainder.
    fn price_discovery_budgets(&self, epoch: u64, available: u128) -> AuctionResult<Vec<u128>> {
        let epochs_left = self.schedule.num_epochs().saturating_sub(epoch.saturating_add(1));
        let count = (self.config.num_pd_slugs as u64).min(epochs_left) as u128;
        if count == 0 {
            return Ok(Vec::new());
        }

        let supply = apply_bps(available, self.config.pd_supply_bps)?;
        let per_slug = supply / count;
        let mut budgets = vec![per_slug; count as usize];
        if let Some(last) = budgets.last_mut() {
            *last += supply % count;
        }
        Ok(budgets)
    }
}

fn placed(role: SlugRole, tick_lower: i32, tick_upper: i32, liquidity: u128) -> AuctionResult<Option<Slug>> {
    if liquidity < MIN_LIQUIDITY {
        return Ok(None);
    }
    Slug::new(role, tick_lower, tick_upper, liquidity).map(Some)
}
