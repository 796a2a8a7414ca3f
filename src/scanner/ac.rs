//! Aho–Corasick multi-pattern scanner for literal (`n…`) phrases (§4.6).
//!
//! One automaton is built from the deduplicated phrase list; every state is
//! a 256-way goto table plus a fail link and an output list of pattern
//! indices accepted at that state. Matching is a single linear pass over
//! the raw bytes with no backtracking.

const ROOT: usize = 0;

struct State {
    goto_: [i32; 256],
    fail: usize,
    outputs: Vec<usize>,
}

impl State {
    fn new() -> Self {
        State { goto_: [-1; 256], fail: ROOT, outputs: Vec::new() }
    }
}

/// A compiled multi-pattern literal matcher, case-sensitive or
/// case-folding depending on how it was built.
pub struct AhoCorasick {
    states: Vec<State>,
    fold_case: bool,
    pattern_lens: Vec<usize>,
}

impl AhoCorasick {
    /// Builds the automaton from `patterns`. When `fold_case` is set, both
    /// the stored trie and the matched input are upper-cased byte-by-byte
    /// during transition, matching the original's simple ASCII fold.
    #[must_use]
    pub fn build(patterns: &[&[u8]], fold_case: bool) -> Self {
        let mut states = vec![State::new()];
        let mut pattern_lens = Vec::with_capacity(patterns.len());

        for (pi, pat) in patterns.iter().enumerate() {
            pattern_lens.push(pat.len());
            let mut cur = ROOT;
            for &b in pat.iter() {
                let b = if fold_case { fold_byte(b) } else { b };
                let next = states[cur].goto_[b as usize];
                cur = if next >= 0 {
                    next as usize
                } else {
                    states.push(State::new());
                    let new_idx = states.len() - 1;
                    states[cur].goto_[b as usize] = new_idx as i32;
                    new_idx
                };
            }
            states[cur].outputs.push(pi);
        }

        build_fail_links(&mut states);
        AhoCorasick { states, fold_case, pattern_lens }
    }

    /// Scans `text`, invoking `hit(pattern_index, start, end_inclusive)` for
    /// every match (overlapping matches all reported, per the original's
    /// "all outputs along the fail chain" contract).
    pub fn scan(&self, text: &[u8], mut hit: impl FnMut(usize, usize, usize)) {
        let mut state = ROOT;
        for (i, &raw) in text.iter().enumerate() {
            let b = if self.fold_case { fold_byte(raw) } else { raw };
            state = self.step(state, b);
            for &pi in &self.states[state].outputs {
                let len = self.pattern_lens[pi];
                if len == 0 || i + 1 < len {
                    continue;
                }
                hit(pi, i + 1 - len, i);
            }
        }
    }

    fn step(&self, mut state: usize, b: u8) -> usize {
        loop {
            let next = self.states[state].goto_[b as usize];
            if next >= 0 {
                return next as usize;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.states[state].fail;
        }
    }
}

fn build_fail_links(states: &mut [State]) {
    let mut queue = std::collections::VecDeque::new();
    for b in 0..256 {
        let child = states[ROOT].goto_[b];
        if child >= 0 {
            states[child as usize].fail = ROOT;
            queue.push_back(child as usize);
        }
    }
    while let Some(cur) = queue.pop_front() {
        let cur_outputs_from_fail: Vec<usize>;
        {
            let fail = states[cur].fail;
            cur_outputs_from_fail = states[fail].outputs.clone();
        }
        for b in 0..256 {
            let child = states[cur].goto_[b];
            if child < 0 {
                continue;
            }
            let child = child as usize;
            let mut f = states[cur].fail;
            loop {
                let via = states[f].goto_[b];
                if via >= 0 {
                    states[child].fail = via as usize;
                    break;
                }
                if f == ROOT {
                    states[child].fail = ROOT;
                    break;
                }
                f = states[f].fail;
            }
            queue.push_back(child);
        }
        let mut merged = states[cur].outputs.clone();
        merged.extend(cur_outputs_from_fail);
        states[cur].outputs = merged;
    }
}

fn fold_byte(b: u8) -> u8 {
    b.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_all_patterns_in_overlapping_text() {
        let ac = AhoCorasick::build(&[b"he", b"she", b"his", b"hers"], false);
        let mut hits = Vec::new();
        ac.scan(b"ushers", |pi, s, e| hits.push((pi, s, e)));
        hits.sort();
        assert_eq!(hits, vec![(0, 1, 2), (1, 0, 2), (3, 1, 4)]);
    }

    #[test]
    fn case_folding_matches_regardless_of_case() {
        let ac = AhoCorasick::build(&[b"cat"], true);
        let mut hits = Vec::new();
        ac.scan(b"a CAT sat", |pi, s, e| hits.push((pi, s, e)));
        assert_eq!(hits, vec![(0, 2, 4)]);
    }

    #[test]
    fn empty_pattern_set_matches_nothing() {
        let ac = AhoCorasick::build(&[], false);
        let mut count = 0;
        ac.scan(b"anything", |_, _, _| count += 1);
        assert_eq!(count, 0);
    }
}
