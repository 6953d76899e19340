// src/core/assignment.rs
//
// Bipartite optimal assignment (Hungarian algorithm, augmenting-path
// variant, O(n^3)). The solver works on integer costs; callers scale
// fractional weights before building the matrix.

/// Whether the total assignment cost is to be minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Minimize,
    Maximize,
}

/// Solves the assignment problem for `costs`, returning the assigned column
/// for every row of the input.
///
/// Non-square inputs (including ragged rows) are padded with zero-cost dummy
/// rows/columns up to the larger dimension before solving; a row assigned to
/// a dummy column simply has no real counterpart, which callers detect by
/// looking the cell up in their original data. For `Maximize` the costs are
/// negated up front and the minimizing core runs unchanged.
pub fn solve(costs: &[Vec<i64>], objective: Objective) -> Vec<usize> {
    let rows = costs.len();
    let cols = costs.iter().map(Vec::len).max().unwrap_or(0);
    let dim = rows.max(cols);

    if dim == 0 {
        return Vec::new();
    }

    let mut matrix = vec![vec![0i64; dim]; dim];
    for (i, row) in costs.iter().enumerate() {
        for (j, &cost) in row.iter().enumerate() {
            matrix[i][j] = match objective {
                Objective::Minimize => cost,
                Objective::Maximize => -cost,
            };
        }
    }

    let mut solver = Solver::new(matrix, dim);
    solver.run();

    (0..rows)
        .map(|i| {
            (0..dim)
                .find(|&j| solver.masks[i][j] == STARRED)
                .unwrap_or(0)
        })
        .collect()
}

const NONE: u8 = 0;
const STARRED: u8 = 1;
const PRIMED: u8 = 2;

struct Solver {
    dim: usize,
    costs: Vec<Vec<i64>>,
    masks: Vec<Vec<u8>>,
    rows_covered: Vec<bool>,
    cols_covered: Vec<bool>,
}

enum Step {
    CoverStarredColumns,
    PrimeZeros,
    AugmentPath((usize, usize)),
    AdjustCosts,
    Done,
}

impl Solver {
    fn new(costs: Vec<Vec<i64>>, dim: usize) -> Self {
        Self {
            dim,
            costs,
            masks: vec![vec![NONE; dim]; dim],
            rows_covered: vec![false; dim],
            cols_covered: vec![false; dim],
        }
    }

    fn run(&mut self) {
        self.reduce_rows();
        self.star_initial_zeros();
        self.clear_covers();

        let mut step = Step::CoverStarredColumns;
        loop {
            step = match step {
                Step::CoverStarredColumns => self.cover_starred_columns(),
                Step::PrimeZeros => self.prime_zeros(),
                Step::AugmentPath(start) => self.augment_path(start),
                Step::AdjustCosts => self.adjust_costs(),
                Step::Done => return,
            };
        }
    }

    /// Subtracts each row's minimum so every row holds at least one zero.
    fn reduce_rows(&mut self) {
        for row in &mut self.costs {
            let min = row.iter().copied().min().unwrap_or(0);
            for cell in row {
                *cell -= min;
            }
        }
    }

    fn star_initial_zeros(&mut self) {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if self.costs[i][j] == 0 && !self.rows_covered[i] && !self.cols_covered[j] {
                    self.masks[i][j] = STARRED;
                    self.rows_covered[i] = true;
                    self.cols_covered[j] = true;
                }
            }
        }
    }

    fn cover_starred_columns(&mut self) -> Step {
        for i in 0..self.dim {
            for j in 0..self.dim {
                if self.masks[i][j] == STARRED {
                    self.cols_covered[j] = true;
                }
            }
        }

        let covered = self.cols_covered.iter().filter(|&&c| c).count();
        if covered == self.dim {
            Step::Done
        } else {
            Step::PrimeZeros
        }
    }

    fn prime_zeros(&mut self) -> Step {
        loop {
            let Some((row, col)) = self.find_uncovered_zero() else {
                return Step::AdjustCosts;
            };

            self.masks[row][col] = PRIMED;

            if let Some(star_col) = self.find_star_in_row(row) {
                self.rows_covered[row] = true;
                self.cols_covered[star_col] = false;
            } else {
                return Step::AugmentPath((row, col));
            }
        }
    }

    fn augment_path(&mut self, start: (usize, usize)) -> Step {
        let mut path = vec![start];

        loop {
            let col = path.last().map(|&(_, c)| c).unwrap_or(0);
            let Some(row) = self.find_star_in_column(col) else {
                break;
            };
            path.push((row, col));

            let prime_col = self
                .find_prime_in_row(row)
                .unwrap_or(0);
            path.push((row, prime_col));
        }

        for &(row, col) in &path {
            self.masks[row][col] = match self.masks[row][col] {
                STARRED => NONE,
                PRIMED => STARRED,
                other => other,
            };
        }

        self.clear_covers();
        self.clear_primes();

        Step::CoverStarredColumns
    }

    fn adjust_costs(&mut self) -> Step {
        let mut min = i64::MAX;
        for i in 0..self.dim {
            for j in 0..self.dim {
                if !self.rows_covered[i] && !self.cols_covered[j] {
                    min = min.min(self.costs[i][j]);
                }
            }
        }

        for i in 0..self.dim {
            for j in 0..self.dim {
                if self.rows_covered[i] {
                    self.costs[i][j] += min;
                }
                if !self.cols_covered[j] {
                    self.costs[i][j] -= min;
                }
            }
        }

        Step::PrimeZeros
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        for i in 0..self.dim {
            if self.rows_covered[i] {
                continue;
            }
            for j in 0..self.dim {
                if self.costs[i][j] == 0 && !self.cols_covered[j] {
                    return Some((i, j));
                }
            }
        }
        None
    }

    fn find_star_in_row(&self, row: usize) -> Option<usize> {
        (0..self.dim).find(|&j| self.masks[row][j] == STARRED)
    }

    fn find_star_in_column(&self, col: usize) -> Option<usize> {
        (0..self.dim).find(|&i| self.masks[i][col] == STARRED)
    }

    fn find_prime_in_row(&self, row: usize) -> Option<usize> {
        (0..self.dim).find(|&j| self.masks[row][j] == PRIMED)
    }

    fn clear_covers(&mut self) {
        self.rows_covered.iter_mut().for_each(|c| *c = false);
        self.cols_covered.iter_mut().for_each(|c| *c = false);
    }

    fn clear_primes(&mut self) {
        for row in &mut self.masks {
            for cell in row {
                if *cell == PRIMED {
                    *cell = NONE;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(costs: &[Vec<i64>], assignment: &[usize]) -> i64 {
        assignment
            .iter()
            .enumerate()
            .map(|(i, &j)| costs[i].get(j).copied().unwrap_or(0))
            .sum()
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        fn go(remaining: &mut Vec<usize>, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            if remaining.is_empty() {
                out.push(current.clone());
                return;
            }
            for i in 0..remaining.len() {
                let picked = remaining.remove(i);
                current.push(picked);
                go(remaining, current, out);
                current.pop();
                remaining.insert(i, picked);
            }
        }
        let mut out = Vec::new();
        go(&mut (0..n).collect::<Vec<_>>(), &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn returns_a_permutation() {
        let costs = vec![
            vec![4, 2, 8],
            vec![4, 3, 7],
            vec![3, 1, 6],
        ];
        let assignment = solve(&costs, Objective::Minimize);
        let mut sorted = assignment.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn minimize_matches_brute_force_up_to_four() {
        let matrices: Vec<Vec<Vec<i64>>> = vec![
            vec![vec![7]],
            vec![vec![1, 2], vec![2, 1]],
            vec![vec![4, 2, 8], vec![4, 3, 7], vec![3, 1, 6]],
            vec![
                vec![82, 83, 69, 92],
                vec![77, 37, 49, 92],
                vec![11, 69, 5, 86],
                vec![8, 9, 98, 23],
            ],
        ];

        for costs in matrices {
            let n = costs.len();
            let assignment = solve(&costs, Objective::Minimize);
            let best = permutations(n)
                .iter()
                .map(|p| total(&costs, p))
                .min()
                .unwrap();
            assert_eq!(total(&costs, &assignment), best);
        }
    }

    #[test]
    fn maximize_matches_brute_force() {
        let costs = vec![
            vec![2000, 1800, 2200, 2200],
            vec![2200, 2000, 10_000, 10_000],
            vec![1800, 10_000, 2000, 2000],
            vec![2200, 2000, 10_000, 10_000],
        ];
        let assignment = solve(&costs, Objective::Maximize);
        let best = permutations(4)
            .iter()
            .map(|p| total(&costs, p))
            .max()
            .unwrap();
        assert_eq!(total(&costs, &assignment), best);
    }

    #[test]
    fn pads_non_square_matrices_with_dummies() {
        // Two rows competing for three columns; the extra column soaks up a
        // dummy row, the real rows take the two best distinct columns.
        let costs = vec![vec![10, 0, 0], vec![10, 8, 0]];
        let assignment = solve(&costs, Objective::Maximize);
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment[0], 0);
        assert_eq!(assignment[1], 1);
    }

    #[test]
    fn empty_input_yields_empty_assignment() {
        assert!(solve(&[], Objective::Minimize).is_empty());
    }
}
