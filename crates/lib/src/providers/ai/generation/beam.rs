//! Deterministic beam search over any `Decoder`.
//!
//! Each step expands every live beam with its `2 * num_beams` most likely
//! tokens, ranks all candidates by cumulative log-probability and keeps the
//! best `num_beams` non-terminal ones. Candidates ending in an end-of-sequence
//! token within the top `num_beams` ranks become finished hypotheses, scored as
//! `sum_logprob / len^length_penalty`. Ties are broken by beam index, then by
//! token id, so the same logits always give the same output.

use super::Decoder;
use crate::errors::GatewayError;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct BeamSearch {
    pub num_beams: usize,
    pub max_new_tokens: usize,
    pub eos_token_ids: Vec<u32>,
    pub length_penalty: f64,
}

impl BeamSearch {
    pub fn new(num_beams: usize, max_new_tokens: usize, eos_token_ids: Vec<u32>) -> Self {
        Self {
            num_beams: num_beams.max(1),
            max_new_tokens,
            eos_token_ids,
            length_penalty: 1.0,
        }
    }

    /// Returns the generated token ids, without the prompt or the end-of-sequence token.
    pub fn run<D: Decoder>(&self, decoder: &D, prompt: &[u32]) -> Result<Vec<u32>, GatewayError> {
        let num_beams = self.num_beams.max(1);
        if self.max_new_tokens == 0 {
            return Ok(Vec::new());
        }

        let (state, logits) = decoder.prefill(prompt)?;
        let mut live = vec![Beam {
            tokens: Vec::new(),
            score: 0.0,
            state,
            logits,
        }];
        let mut finished = Hypotheses::new(num_beams);

        for step in 0..self.max_new_tokens {
            let last_step = step + 1 == self.max_new_tokens;
            let candidates = self.rank_candidates(&live, num_beams);

            let mut next = Vec::with_capacity(num_beams);
            for (rank, candidate) in candidates.into_iter().enumerate() {
                let parent = &live[candidate.beam];
                if self.eos_token_ids.contains(&candidate.token) {
                    if rank < num_beams {
                        let len = parent.tokens.len() + 1;
                        finished.add(self.normalize(candidate.score, len), parent.tokens.clone());
                    }
                    continue;
                }

                let mut tokens = parent.tokens.clone();
                tokens.push(candidate.token);
                let mut state = parent.state.clone();
                let logits = if last_step {
                    Vec::new()
                } else {
                    decoder.decode(&mut state, candidate.token)?
                };
                next.push(Beam {
                    tokens,
                    score: candidate.score,
                    state,
                    logits,
                });
                if next.len() == num_beams {
                    break;
                }
            }
            live = next;

            if live.is_empty() || self.is_done(&finished, &live) {
                break;
            }
        }

        for beam in live {
            let len = beam.tokens.len();
            finished.add(self.normalize(beam.score, len), beam.tokens);
        }

        Ok(finished.best().unwrap_or_default())
    }

    fn rank_candidates<S>(&self, live: &[Beam<S>], num_beams: usize) -> Vec<Candidate> {
        let per_beam = 2 * num_beams;
        let mut candidates: Vec<Candidate> = live
            .iter()
            .enumerate()
            .flat_map(|(beam, b)| {
                top_k(&log_softmax(&b.logits), per_beam)
                    .into_iter()
                    .map(move |(token, logprob)| Candidate {
                        beam,
                        token,
                        score: b.score + logprob,
                    })
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.beam.cmp(&b.beam))
                .then(a.token.cmp(&b.token))
        });
        candidates
    }

    fn normalize(&self, score: f64, len: usize) -> f64 {
        score / (len.max(1) as f64).powf(self.length_penalty)
    }

    /// True when no live beam can still beat the worst kept hypothesis.
    fn is_done<S>(&self, finished: &Hypotheses, live: &[Beam<S>]) -> bool {
        let Some(worst) = finished.worst_if_full() else {
            return false;
        };
        live.iter()
            .map(|b| self.normalize(b.score, b.tokens.len()))
            .all(|best_possible| best_possible <= worst)
    }
}

struct Beam<S> {
    tokens: Vec<u32>,
    score: f64,
    state: S,
    logits: Vec<f32>,
}

struct Candidate {
    beam: usize,
    token: u32,
    score: f64,
}

/// The best `capacity` finished sequences, in insertion order.
struct Hypotheses {
    capacity: usize,
    entries: Vec<(f64, Vec<u32>)>,
}

impl Hypotheses {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    fn worst_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.0.total_cmp(&b.0))
            .map(|(i, _)| i)
    }

    fn worst_if_full(&self) -> Option<f64> {
        if self.entries.len() < self.capacity {
            return None;
        }
        self.worst_index().map(|i| self.entries[i].0)
    }

    fn add(&mut self, score: f64, tokens: Vec<u32>) {
        if self.entries.len() < self.capacity {
            self.entries.push((score, tokens));
            return;
        }
        if let Some(i) = self.worst_index() {
            if score > self.entries[i].0 {
                self.entries.remove(i);
                self.entries.push((score, tokens));
            }
        }
    }

    fn best(self) -> Option<Vec<u32>> {
        let mut best: Option<(f64, Vec<u32>)> = None;
        for (score, tokens) in self.entries {
            match &best {
                Some((top, _)) if score.total_cmp(top) != Ordering::Greater => {}
                _ => best = Some((score, tokens)),
            }
        }
        best.map(|(_, tokens)| tokens)
    }
}

fn log_softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&x| x as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = logits.iter().map(|&x| (x as f64 - max).exp()).sum();
    let log_sum = sum.ln();
    logits.iter().map(|&x| x as f64 - max - log_sum).collect()
}

/// The `k` highest log-probabilities, best first, lower token id first on ties.
fn top_k(logprobs: &[f64], k: usize) -> Vec<(u32, f64)> {
    let order = |a: &(u32, f64), b: &(u32, f64)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
    let mut indexed: Vec<(u32, f64)> = logprobs
        .iter()
        .enumerate()
        .map(|(i, &lp)| (i as u32, lp))
        .collect();
    if k < indexed.len() {
        indexed.select_nth_unstable_by(k, order);
        indexed.truncate(k);
    }
    indexed.sort_by(order);
    indexed
}
