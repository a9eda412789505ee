//! Tagged factors for exact inference.
//!
//! A factor is an ordered list of variable indices plus a flat probability
//! array indexed by mixed-radix state tuples (last variable varies
//! fastest). All elimination arithmetic happens on this representation;
//! no name-keyed tables exist on the inference path, which keeps
//! allocation predictable.

/// A function from joint variable states to a non-negative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    vars: Vec<usize>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

fn strides_of(cards: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cards[i + 1];
    }
    strides
}

impl Factor {
    /// Builds a factor over `vars` with per-variable cardinalities and a
    /// flat value array of length `product(cards)`.
    #[must_use]
    pub fn new(vars: Vec<usize>, cards: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(vars.len(), cards.len());
        debug_assert_eq!(values.len(), cards.iter().product::<usize>().max(1));
        Self { vars, cards, values }
    }

    /// A factor over no variables holding a single weight.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            vars: Vec::new(),
            cards: Vec::new(),
            values: vec![value],
        }
    }

    /// The variable indices this factor ranges over, in tuple order.
    #[must_use]
    pub fn vars(&self) -> &[usize] {
        &self.vars
    }

    /// The flat value array.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns true if the factor mentions `var`.
    #[must_use]
    pub fn mentions(&self, var: usize) -> bool {
        self.vars.contains(&var)
    }

    fn position(&self, var: usize) -> Option<usize> {
        self.vars.iter().position(|&v| v == var)
    }

    /// Fixes `var` to `state` and drops it from the tuple.
    ///
    /// A factor that does not mention `var` is returned unchanged.
    #[must_use]
    pub fn restrict(&self, var: usize, state: usize) -> Self {
        let Some(pos) = self.position(var) else {
            return self.clone();
        };

        let strides = strides_of(&self.cards);
        let mut out_vars = self.vars.clone();
        let mut out_cards = self.cards.clone();
        out_vars.remove(pos);
        out_cards.remove(pos);

        let out_size = out_cards.iter().product::<usize>().max(1);
        let mut out_values = Vec::with_capacity(out_size);

        for (idx, &value) in self.values.iter().enumerate() {
            if (idx / strides[pos]) % self.cards[pos] == state {
                out_values.push(value);
            }
        }
        debug_assert_eq!(out_values.len(), out_size);
        Self::new(out_vars, out_cards, out_values)
    }

    /// Sums `var` out of the factor.
    ///
    /// A factor that does not mention `var` is returned unchanged.
    #[must_use]
    pub fn sum_out(&self, var: usize) -> Self {
        let Some(pos) = self.position(var) else {
            return self.clone();
        };

        let strides = strides_of(&self.cards);
        let mut out_vars = self.vars.clone();
        let mut out_cards = self.cards.clone();
        out_vars.remove(pos);
        out_cards.remove(pos);

        let out_size = out_cards.iter().product::<usize>().max(1);
        let out_strides = strides_of(&out_cards);
        let mut out_values = vec![0.0f64; out_size];

        for (idx, &value) in self.values.iter().enumerate() {
            let mut out_idx = 0usize;
            let mut j = 0usize;
            for i in 0..self.vars.len() {
                if i == pos {
                    continue;
                }
                let state = (idx / strides[i]) % self.cards[i];
                out_idx += state * out_strides[j];
                j += 1;
            }
            out_values[out_idx] += value;
        }
        Self::new(out_vars, out_cards, out_values)
    }

    /// Pointwise product over the union of both variable tuples.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut vars = self.vars.clone();
        let mut cards = self.cards.clone();
        for (v, c) in other.vars.iter().zip(&other.cards) {
            if !vars.contains(v) {
                vars.push(*v);
                cards.push(*c);
            }
        }

        let size = cards.iter().product::<usize>().max(1);
        let strides = strides_of(&cards);

        // Position of each operand variable inside the result tuple.
        let map_positions = |f: &Self| -> Vec<usize> {
            f.vars
                .iter()
                .map(|v| {
                    vars.iter()
                        .position(|x| x == v)
                        .unwrap_or_else(|| unreachable!("operand var missing from union"))
                })
                .collect()
        };
        let self_pos = map_positions(self);
        let other_pos = map_positions(other);

        let self_strides = strides_of(&self.cards);
        let other_strides = strides_of(&other.cards);

        let mut values = Vec::with_capacity(size);
        for idx in 0..size {
            let state_at = |pos: usize| (idx / strides[pos]) % cards[pos];

            let mut self_idx = 0usize;
            for (i, &pos) in self_pos.iter().enumerate() {
                self_idx += state_at(pos) * self_strides[i];
            }
            let mut other_idx = 0usize;
            for (i, &pos) in other_pos.iter().enumerate() {
                other_idx += state_at(pos) * other_strides[i];
            }

            values.push(self.values[self_idx] * other.values[other_idx]);
        }
        Self::new(vars, cards, values)
    }

    /// Total weight across all states.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Scales the factor so its weights sum to 1, or returns `None` when
    /// the total weight is zero (a zero-probability event).
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let values = self.values.iter().map(|v| v / total).collect();
        Some(Self::new(self.vars.clone(), self.cards.clone(), values))
    }
}
