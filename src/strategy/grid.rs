use rust_decimal::Decimal;

use crate::common::errors::{EngineError, Result};
use crate::common::types::PercentExt;

/// Validated grid shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridParams {
    diapason: Decimal,
    grid_size: u32,
}

impl GridParams {
    /// `diapason` is the half-width of the grid in percent of the middle
    /// price and must lie in `(0, 100)`; `grid_size` is the number of steps.
    pub fn new(diapason: Decimal, grid_size: u32) -> Result<Self> {
        if diapason <= Decimal::ZERO || diapason >= Decimal::ONE_HUNDRED {
            return Err(EngineError::InvalidGrid(format!(
                "diapason must be within (0, 100), got {}",
                diapason
            )));
        }
        if grid_size == 0 {
            return Err(EngineError::InvalidGrid(
                "grid size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            diapason,
            grid_size,
        })
    }

    pub fn diapason(&self) -> Decimal {
        self.diapason
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }
}

/// Price ladder spanning `middle ± diapason%` in `grid_size` equal steps
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    middle: Decimal,
    min_price: Decimal,
    max_price: Decimal,
    step: Decimal,
    levels: Vec<Decimal>,
}

impl Grid {
    pub fn around(params: &GridParams, middle: Decimal) -> Self {
        let min_price = middle.plus_percent(-params.diapason);
        let max_price = middle.plus_percent(params.diapason);
        let step = (max_price - min_price) / Decimal::from(params.grid_size);
        let levels = (0..=params.grid_size)
            .map(|i| min_price + step * Decimal::from(i))
            .collect();

        Self {
            middle,
            min_price,
            max_price,
            step,
            levels,
        }
    }

    pub fn middle(&self) -> Decimal {
        self.middle
    }

    pub fn min_price(&self) -> Decimal {
        self.min_price
    }

    pub fn max_price(&self) -> Decimal {
        self.max_price
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    /// Levels in ascending order
    pub fn levels(&self) -> &[Decimal] {
        &self.levels
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min_price && price <= self.max_price
    }

    /// Levels crossed moving from `previous` to `current`, in traversal order
    ///
    /// Falling: `previous > level >= current`. Rising:
    /// `previous < level <= current`. Touching a level counts as crossing
    /// it; leaving one does not.
    pub fn crossed_levels(&self, previous: Decimal, current: Decimal) -> Vec<Decimal> {
        if current < previous {
            self.levels
                .iter()
                .rev()
                .copied()
                .filter(|level| previous > *level && *level >= current)
                .collect()
        } else if current > previous {
            self.levels
                .iter()
                .copied()
                .filter(|level| previous < *level && *level <= current)
                .collect()
        } else {
            Vec::new()
        }
    }
}
