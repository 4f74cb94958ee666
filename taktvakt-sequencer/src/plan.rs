//! Which services are due on a given tick.
//!
//! Kept free of threads and clocks so release decisions can be checked tick
//! by tick.

use crate::service::Period;

#[derive(Debug, Clone)]
pub struct ReleasePlan {
    periods: Vec<Period>,
    released_once: Vec<bool>,
    wrap_modulus: u64,
}

impl ReleasePlan {
    /// `wrap_modulus` must be non-zero and every periodic period must divide it.
    pub fn new(periods: Vec<Period>, wrap_modulus: u64) -> Self {
        let released_once = vec![false; periods.len()];
        Self {
            periods,
            released_once,
            wrap_modulus,
        }
    }

    /// Position of `tick` inside the current hyperperiod.
    #[inline]
    pub fn cycle_tick(&self, tick: u64) -> u64 {
        tick % self.wrap_modulus
    }

    /// Appends the indices of services due at `tick` to `due`.
    ///
    /// Run-once services are due at the first tick evaluated and never again.
    pub fn due_at(&mut self, tick: u64, due: &mut Vec<usize>) {
        let cycle_tick = self.cycle_tick(tick);
        for (index, period) in self.periods.iter().enumerate() {
            match *period {
                Period::Ticks(period) => {
                    if period != 0 && cycle_tick % period == 0 {
                        due.push(index);
                    }
                }
                Period::RunOnce => {
                    if !self.released_once[index] {
                        self.released_once[index] = true;
                        due.push(index);
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn releases(plan: &mut ReleasePlan, ticks: u64) -> Vec<Vec<u64>> {
        let mut per_service = vec![Vec::new(); plan.len()];
        let mut due = Vec::new();
        for tick in 0..ticks {
            due.clear();
            plan.due_at(tick, &mut due);
            for &index in &due {
                per_service[index].push(tick);
            }
        }
        per_service
    }

    #[test]
    fn periodic_released_on_multiples() {
        let mut plan = ReleasePlan::new(vec![Period::Ticks(5), Period::Ticks(1)], 1000);
        let released = releases(&mut plan, 23);
        assert_eq!(released[0], vec![0, 5, 10, 15, 20]);
        assert_eq!(released[1], (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn run_once_released_exactly_once() {
        let mut plan = ReleasePlan::new(vec![Period::RunOnce, Period::Ticks(2)], 10);
        let released = releases(&mut plan, 5_000);
        assert_eq!(released[0], vec![0]);
        assert_eq!(released[1].len(), 2_500);
    }

    #[test]
    fn wrap_preserves_divisor_periods() {
        let mut plan = ReleasePlan::new(vec![Period::Ticks(4)], 8);
        let released = releases(&mut plan, 30);
        let expected: Vec<u64> = (0..30).step_by(4).collect();
        assert_eq!(released[0], expected);
        assert_eq!(plan.cycle_tick(17), 1);
    }
}
