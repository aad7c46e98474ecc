use serde::Serialize;
use tracing::debug;

use crate::core::matrix::ScoreMatrix;
use crate::solver::{SolverError, MAX_SCALED_WEIGHT, WEIGHT_SCALE};

/// Undirected weighted edge `(u, v, weight)`
pub type WeightedEdge = (usize, usize, f64);

/// One matched pair inside a same-sex pool, `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchedPair {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

const NONE: usize = usize::MAX;

/// Maximum-weight matching in a general graph with `vertices` vertices
///
/// Edmonds' blossom algorithm with primal-dual updates, O(n^3). Only edges
/// with strictly positive weight can be matched and the matching need not
/// be of maximum cardinality. Returns pairs `(u, v)` with `u < v`, sorted.
pub fn max_weight_matching(
    vertices: usize,
    edges: &[WeightedEdge],
) -> Result<Vec<(usize, usize)>, SolverError> {
    let mut scaled = Vec::with_capacity(edges.len());
    for &(u, v, weight) in edges {
        if u == v || u >= vertices || v >= vertices {
            return Err(SolverError::InvalidEdge { u, v, vertices });
        }
        let fixed = (weight * WEIGHT_SCALE).round();
        if !fixed.is_finite() || fixed.abs() > MAX_SCALED_WEIGHT {
            return Err(SolverError::WeightOutOfRange(weight));
        }
        if fixed > 0.0 {
            scaled.push((u, v, fixed as i64));
        }
    }

    if scaled.is_empty() {
        return Ok(Vec::new());
    }

    let mate = BlossomState::new(vertices, scaled).solve();
    let mut pairs: Vec<(usize, usize)> = mate
        .iter()
        .enumerate()
        .filter(|&(u, &v)| v != NONE && u < v)
        .map(|(u, &v)| (u, v))
        .collect();
    pairs.sort_unstable();
    Ok(pairs)
}

/// Match members of one pool on a symmetric weight matrix
///
/// Edge (i, j) exists only for `i < j` with a strictly positive weight;
/// disqualified and non-positive cells never become edges.
pub fn match_same_pool(weights: &ScoreMatrix) -> Result<Vec<MatchedPair>, SolverError> {
    let (rows, cols) = weights.shape();
    if rows != cols {
        return Err(SolverError::NotSquare { rows, cols });
    }

    let mut edges = Vec::new();
    for i in 0..rows {
        for j in (i + 1)..cols {
            let score = weights.get(i, j);
            if score.is_positive() {
                if let Some(weight) = score.value() {
                    edges.push((i, j, weight));
                }
            }
        }
    }
    debug!("Same-pool graph: {} vertices, {} edges", rows, edges.len());

    let pairs = max_weight_matching(rows, &edges)?;
    Ok(pairs
        .into_iter()
        .filter_map(|(a, b)| {
            weights
                .get(a, b)
                .value()
                .map(|weight| MatchedPair { a, b, weight })
        })
        .collect())
}

/// Working state of the blossom algorithm
///
/// Vertices are `0..n`, blossoms `n..2n`. Edge `k` has endpoints `2k` and
/// `2k + 1`; `endpoint[p]` is the vertex at endpoint `p` and `p ^ 1` is the
/// opposite end. Labels: 0 free, 1 outer (S), 2 inner (T).
struct BlossomState {
    n: usize,
    edges: Vec<(usize, usize, i64)>,
    endpoint: Vec<usize>,
    neighbend: Vec<Vec<usize>>,
    mate: Vec<usize>,
    label: Vec<i8>,
    labelend: Vec<usize>,
    inblossom: Vec<usize>,
    blossomparent: Vec<usize>,
    blossomchilds: Vec<Vec<usize>>,
    blossombase: Vec<usize>,
    blossomendps: Vec<Vec<usize>>,
    bestedge: Vec<usize>,
    blossombestedges: Vec<Option<Vec<usize>>>,
    unusedblossoms: Vec<usize>,
    dualvar: Vec<i64>,
    allowedge: Vec<bool>,
    queue: Vec<usize>,
}

impl BlossomState {
    fn new(n: usize, edges: Vec<(usize, usize, i64)>) -> Self {
        let max_weight = edges.iter().map(|&(_, _, w)| w).max().unwrap_or(0).max(0);

        let mut endpoint = Vec::with_capacity(2 * edges.len());
        let mut neighbend = vec![Vec::new(); n];
        for (k, &(i, j, _)) in edges.iter().enumerate() {
            endpoint.push(i);
            endpoint.push(j);
            neighbend[i].push(2 * k + 1);
            neighbend[j].push(2 * k);
        }

        let mut blossombase: Vec<usize> = (0..n).collect();
        blossombase.extend(std::iter::repeat(NONE).take(n));
        let mut dualvar = vec![max_weight; n];
        dualvar.extend(std::iter::repeat(0).take(n));
        let edge_count = edges.len();

        Self {
            n,
            edges,
            endpoint,
            neighbend,
            mate: vec![NONE; n],
            label: vec![0; 2 * n],
            labelend: vec![NONE; 2 * n],
            inblossom: (0..n).collect(),
            blossomparent: vec![NONE; 2 * n],
            blossomchilds: vec![Vec::new(); 2 * n],
            blossombase,
            blossomendps: vec![Vec::new(); 2 * n],
            bestedge: vec![NONE; 2 * n],
            blossombestedges: vec![None; 2 * n],
            unusedblossoms: (n..2 * n).collect(),
            dualvar,
            allowedge: vec![false; edge_count],
            queue: Vec::new(),
        }
    }

    fn slack(&self, k: usize) -> i64 {
        let (i, j, w) = self.edges[k];
        self.dualvar[i] + self.dualvar[j] - 2 * w
    }

    /// Vertices contained in blossom `b`, in child order
    fn leaves(&self, b: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![b];
        while let Some(x) = stack.pop() {
            if x < self.n {
                out.push(x);
            } else {
                stack.extend(self.blossomchilds[x].iter().rev());
            }
        }
        out
    }

    /// Position of `child` in the child cycle of `b`
    fn child_position(&self, b: usize, child: usize) -> usize {
        self.blossomchilds[b]
            .iter()
            .position(|&c| c == child)
            .unwrap_or(0)
    }

    fn assign_label(&mut self, w: usize, t: i8, p: usize) {
        let b = self.inblossom[w];
        self.label[w] = t;
        self.label[b] = t;
        self.labelend[w] = p;
        self.labelend[b] = p;
        self.bestedge[w] = NONE;
        self.bestedge[b] = NONE;

        if t == 1 {
            let leaves = self.leaves(b);
            self.queue.extend(leaves);
        } else if t == 2 {
            let base = self.blossombase[b];
            let mate = self.mate[base];
            let next = self.endpoint[mate];
            self.assign_label(next, 1, mate ^ 1);
        }
    }

    /// Trace back from `v` and `w` to find a new blossom or an augmenting
    /// path; returns the blossom base, or `NONE` for an augmenting path
    fn scan_blossom(&mut self, mut v: usize, mut w: usize) -> usize {
        let mut path = Vec::new();
        let mut base = NONE;

        while v != NONE || w != NONE {
            let mut b = self.inblossom[v];
            if self.label[b] & 4 != 0 {
                base = self.blossombase[b];
                break;
            }
            path.push(b);
            self.label[b] = 5;

            if self.labelend[b] == NONE {
                v = NONE;
            } else {
                v = self.endpoint[self.labelend[b]];
                b = self.inblossom[v];
                v = self.endpoint[self.labelend[b]];
            }
            if w != NONE {
                std::mem::swap(&mut v, &mut w);
            }
        }

        for b in path {
            self.label[b] = 1;
        }
        base
    }

    /// Contract the odd cycle closed by edge `k` into a new blossom
    fn add_blossom(&mut self, base: usize, k: usize) {
        let (v, w, _) = self.edges[k];
        let bb = self.inblossom[base];
        let mut bv = self.inblossom[v];
        let mut bw = self.inblossom[w];

        let Some(b) = self.unusedblossoms.pop() else {
            return;
        };
        self.blossombase[b] = base;
        self.blossomparent[b] = NONE;
        self.blossomparent[bb] = b;

        let mut path = Vec::new();
        let mut endps = Vec::new();
        while bv != bb {
            self.blossomparent[bv] = b;
            path.push(bv);
            endps.push(self.labelend[bv]);
            let next = self.endpoint[self.labelend[bv]];
            bv = self.inblossom[next];
        }
        path.push(bb);
        path.reverse();
        endps.reverse();
        endps.push(2 * k);
        while bw != bb {
            self.blossomparent[bw] = b;
            path.push(bw);
            endps.push(self.labelend[bw] ^ 1);
            let next = self.endpoint[self.labelend[bw]];
            bw = self.inblossom[next];
        }

        self.blossomchilds[b] = path;
        self.blossomendps[b] = endps;
        self.label[b] = 1;
        self.labelend[b] = self.labelend[bb];
        self.dualvar[b] = 0;

        for leaf in self.leaves(b) {
            if self.label[self.inblossom[leaf]] == 2 {
                self.queue.push(leaf);
            }
            self.inblossom[leaf] = b;
        }

        let mut bestedgeto = vec![NONE; 2 * self.n];
        for child in self.blossomchilds[b].clone() {
            let nblists: Vec<Vec<usize>> = match self.blossombestedges[child].take() {
                Some(list) => vec![list],
                None => self
                    .leaves(child)
                    .into_iter()
                    .map(|leaf| self.neighbend[leaf].iter().map(|p| p / 2).collect())
                    .collect(),
            };

            for k in nblists.into_iter().flatten() {
                let (i, j, _) = self.edges[k];
                let j = if self.inblossom[j] == b { i } else { j };
                let bj = self.inblossom[j];
                if bj != b
                    && self.label[bj] == 1
                    && (bestedgeto[bj] == NONE || self.slack(k) < self.slack(bestedgeto[bj]))
                {
                    bestedgeto[bj] = k;
                }
            }
            self.bestedge[child] = NONE;
        }

        let best: Vec<usize> = bestedgeto.into_iter().filter(|&k| k != NONE).collect();
        self.bestedge[b] = NONE;
        for &k in &best {
            if self.bestedge[b] == NONE || self.slack(k) < self.slack(self.bestedge[b]) {
                self.bestedge[b] = k;
            }
        }
        self.blossombestedges[b] = Some(best);
    }

    /// Dissolve blossom `b` back into its children
    fn expand_blossom(&mut self, b: usize, endstage: bool) {
        for s in self.blossomchilds[b].clone() {
            self.blossomparent[s] = NONE;
            if s < self.n {
                self.inblossom[s] = s;
            } else if endstage && self.dualvar[s] == 0 {
                self.expand_blossom(s, endstage);
            } else {
                for leaf in self.leaves(s) {
                    self.inblossom[leaf] = s;
                }
            }
        }

        if !endstage && self.label[b] == 2 {
            // relabel the even-length path from the entry child to the base
            let len = self.blossomchilds[b].len() as isize;
            let wrap = |index: isize| index.rem_euclid(len) as usize;

            let entrychild = self.inblossom[self.endpoint[self.labelend[b] ^ 1]];
            let mut j = self.child_position(b, entrychild) as isize;
            let (jstep, endptrick): (isize, usize) = if j & 1 != 0 {
                j -= len;
                (1, 0)
            } else {
                (-1, 1)
            };

            let mut p = self.labelend[b];
            while j != 0 {
                let far = self.endpoint[p ^ 1];
                self.label[far] = 0;
                let e = self.blossomendps[b][wrap(j - endptrick as isize)];
                let near = self.endpoint[e ^ endptrick ^ 1];
                self.label[near] = 0;
                self.assign_label(far, 2, p);
                self.allowedge[e / 2] = true;
                j += jstep;
                p = self.blossomendps[b][wrap(j - endptrick as isize)] ^ endptrick;
                self.allowedge[p / 2] = true;
                j += jstep;
            }

            let bv = self.blossomchilds[b][wrap(j)];
            let far = self.endpoint[p ^ 1];
            self.label[far] = 2;
            self.label[bv] = 2;
            self.labelend[far] = p;
            self.labelend[bv] = p;
            self.bestedge[bv] = NONE;
            j += jstep;

            while self.blossomchilds[b][wrap(j)] != entrychild {
                let bv = self.blossomchilds[b][wrap(j)];
                if self.label[bv] == 1 {
                    j += jstep;
                    continue;
                }
                let reached = self
                    .leaves(bv)
                    .into_iter()
                    .find(|&leaf| self.label[leaf] != 0);
                if let Some(v) = reached {
                    self.label[v] = 0;
                    let mate = self.mate[self.blossombase[bv]];
                    let opposite = self.endpoint[mate];
                    self.label[opposite] = 0;
                    let end = self.labelend[v];
                    self.assign_label(v, 2, end);
                }
                j += jstep;
            }
        }

        self.label[b] = -1;
        self.labelend[b] = NONE;
        self.blossomchilds[b].clear();
        self.blossomendps[b].clear();
        self.blossombase[b] = NONE;
        self.blossombestedges[b] = None;
        self.bestedge[b] = NONE;
        self.unusedblossoms.push(b);
    }

    /// Swap matched and unmatched edges along the path from `v` to the base
    /// of blossom `b`, making `v` the new base
    fn augment_blossom(&mut self, b: usize, v: usize) {
        let mut t = v;
        while self.blossomparent[t] != b {
            t = self.blossomparent[t];
        }
        if t >= self.n {
            self.augment_blossom(t, v);
        }

        let len = self.blossomchilds[b].len() as isize;
        let wrap = |index: isize| index.rem_euclid(len) as usize;
        let i = self.child_position(b, t);
        let mut j = i as isize;
        let (jstep, endptrick): (isize, usize) = if i & 1 != 0 {
            j -= len;
            (1, 0)
        } else {
            (-1, 1)
        };

        while j != 0 {
            j += jstep;
            let t = self.blossomchilds[b][wrap(j)];
            let p = self.blossomendps[b][wrap(j - endptrick as isize)] ^ endptrick;
            if t >= self.n {
                let entry = self.endpoint[p];
                self.augment_blossom(t, entry);
            }
            j += jstep;
            let t = self.blossomchilds[b][wrap(j)];
            if t >= self.n {
                let entry = self.endpoint[p ^ 1];
                self.augment_blossom(t, entry);
            }
            let (left, right) = (self.endpoint[p], self.endpoint[p ^ 1]);
            self.mate[left] = p ^ 1;
            self.mate[right] = p;
        }

        self.blossomchilds[b].rotate_left(i);
        self.blossomendps[b].rotate_left(i);
        self.blossombase[b] = self.blossombase[self.blossomchilds[b][0]];
    }

    /// Flip the augmenting path through edge `k`
    fn augment_matching(&mut self, k: usize) {
        let (v, w, _) = self.edges[k];
        for (mut s, mut p) in [(v, 2 * k + 1), (w, 2 * k)] {
            loop {
                let bs = self.inblossom[s];
                if bs >= self.n {
                    self.augment_blossom(bs, s);
                }
                self.mate[s] = p;
                if self.labelend[bs] == NONE {
                    break;
                }
                let t = self.endpoint[self.labelend[bs]];
                let bt = self.inblossom[t];
                s = self.endpoint[self.labelend[bt]];
                let j = self.endpoint[self.labelend[bt] ^ 1];
                if bt >= self.n {
                    self.augment_blossom(bt, j);
                }
                self.mate[j] = self.labelend[bt];
                p = self.labelend[bt] ^ 1;
            }
        }
    }

    /// Run stages until no augmenting path improves the weight; returns
    /// the mate vertex of every vertex, `NONE` when unmatched
    fn solve(mut self) -> Vec<usize> {
        let n = self.n;

        for _ in 0..n {
            self.label.fill(0);
            self.bestedge.fill(NONE);
            for slot in &mut self.blossombestedges[n..] {
                *slot = None;
            }
            self.allowedge.fill(false);
            self.queue.clear();

            for v in 0..n {
                if self.mate[v] == NONE && self.label[self.inblossom[v]] == 0 {
                    self.assign_label(v, 1, NONE);
                }
            }

            let mut augmented = false;
            loop {
                while !augmented {
                    let Some(v) = self.queue.pop() else {
                        break;
                    };

                    for p in self.neighbend[v].clone() {
                        let k = p / 2;
                        let w = self.endpoint[p];
                        if self.inblossom[v] == self.inblossom[w] {
                            continue;
                        }

                        let mut kslack = 0;
                        if !self.allowedge[k] {
                            kslack = self.slack(k);
                            if kslack <= 0 {
                                self.allowedge[k] = true;
                            }
                        }

                        if self.allowedge[k] {
                            if self.label[self.inblossom[w]] == 0 {
                                self.assign_label(w, 2, p ^ 1);
                            } else if self.label[self.inblossom[w]] == 1 {
                                let base = self.scan_blossom(v, w);
                                if base != NONE {
                                    self.add_blossom(base, k);
                                } else {
                                    self.augment_matching(k);
                                    augmented = true;
                                    break;
                                }
                            } else if self.label[w] == 0 {
                                self.label[w] = 2;
                                self.labelend[w] = p ^ 1;
                            }
                        } else if self.label[self.inblossom[w]] == 1 {
                            let b = self.inblossom[v];
                            if self.bestedge[b] == NONE || kslack < self.slack(self.bestedge[b]) {
                                self.bestedge[b] = k;
                            }
                        } else if self.label[w] == 0
                            && (self.bestedge[w] == NONE || kslack < self.slack(self.bestedge[w]))
                        {
                            self.bestedge[w] = k;
                        }
                    }
                }

                if augmented {
                    break;
                }

                // dual adjustment; type 1 ends the search
                let mut delta_type = 1;
                let mut delta = self.dualvar[..n].iter().copied().min().unwrap_or(0);
                let mut delta_edge = NONE;
                let mut delta_blossom = NONE;

                for v in 0..n {
                    if self.label[self.inblossom[v]] == 0 && self.bestedge[v] != NONE {
                        let d = self.slack(self.bestedge[v]);
                        if d < delta {
                            delta = d;
                            delta_type = 2;
                            delta_edge = self.bestedge[v];
                        }
                    }
                }

                for b in 0..2 * n {
                    if self.blossomparent[b] == NONE && self.label[b] == 1 && self.bestedge[b] != NONE {
                        let d = self.slack(self.bestedge[b]) / 2;
                        if d < delta {
                            delta = d;
                            delta_type = 3;
                            delta_edge = self.bestedge[b];
                        }
                    }
                }

                for b in n..2 * n {
                    if self.blossombase[b] != NONE
                        && self.blossomparent[b] == NONE
                        && self.label[b] == 2
                        && self.dualvar[b] < delta
                    {
                        delta = self.dualvar[b];
                        delta_type = 4;
                        delta_blossom = b;
                    }
                }

                for v in 0..n {
                    match self.label[self.inblossom[v]] {
                        1 => self.dualvar[v] -= delta,
                        2 => self.dualvar[v] += delta,
                        _ => {}
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE && self.blossomparent[b] == NONE {
                        match self.label[b] {
                            1 => self.dualvar[b] += delta,
                            2 => self.dualvar[b] -= delta,
                            _ => {}
                        }
                    }
                }

                match delta_type {
                    2 => {
                        self.allowedge[delta_edge] = true;
                        let (i, j, _) = self.edges[delta_edge];
                        let outer = if self.label[self.inblossom[i]] == 0 { j } else { i };
                        self.queue.push(outer);
                    }
                    3 => {
                        self.allowedge[delta_edge] = true;
                        let (i, _, _) = self.edges[delta_edge];
                        self.queue.push(i);
                    }
                    4 => self.expand_blossom(delta_blossom, false),
                    _ => break,
                }
            }

            if !augmented {
                break;
            }

            for b in n..2 * n {
                if self.blossomparent[b] == NONE
                    && self.blossombase[b] != NONE
                    && self.label[b] == 1
                    && self.dualvar[b] == 0
                {
                    self.expand_blossom(b, true);
                }
            }
        }

        self.mate
            .iter()
            .map(|&p| if p == NONE { NONE } else { self.endpoint[p] })
            .collect()
    }
}
