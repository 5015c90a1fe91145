//! Read budget for the shutdown command.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bytes read from a control connection when the token fits.
pub const BASE_READ_BUDGET: usize = 1024;

/// Upper bound of the bytes read from one control connection.
///
/// Starts at [`BASE_READ_BUDGET`] and, while still shorter than the token,
/// grows by increments drawn from `next_increment`. Caps what an
/// unauthenticated local peer can make the agent read.
pub fn compute_read_budget<F>(token_len: usize, mut next_increment: F) -> usize
where
    F: FnMut() -> usize,
{
    let mut budget = BASE_READ_BUDGET;
    while budget < token_len {
        budget += next_increment().max(1);
    }
    budget
}

/// Random increment source, seeded on first use.
#[derive(Debug, Default)]
pub struct BudgetRng {
    rng: Option<StdRng>,
}

impl BudgetRng {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next increment in `1..1024`.
    pub fn next_increment(&mut self) -> usize {
        self.rng
            .get_or_insert_with(StdRng::from_entropy)
            .gen_range(1..BASE_READ_BUDGET)
    }

    /// Budget for `token_len` using this generator.
    pub fn budget_for(&mut self, token_len: usize) -> usize {
        compute_read_budget(token_len, || self.next_increment())
    }
}
