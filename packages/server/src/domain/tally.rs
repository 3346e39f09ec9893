//! ランキング集計
//!
//! 参加者ごとのランキングから各ノミネーションのスコアを計算する純粋関数。
//! 0 始まりの順位 `n`、枠数 `V` に対する寄与は
//! `((V - 0.5 * n) / V) ^ (n + 1)` で、上位ほど大きく、下位ほど急速に減衰します。
//!
//! 同点の並びは「最初に現れた順」です。参加者 ID の昇順にランキングを走査し、
//! 各リストを先頭から見たときに初めて現れた順序が保たれます（安定ソート）。

use std::collections::{BTreeMap, HashMap};

use super::{
    entity::{Nomination, PollResult},
    value_object::{NominationId, ParticipantId, VotesPerParticipant},
};

/// 順位 `position`（0 始まり）の 1 票あたりの寄与
pub fn contribution(votes_per_participant: VotesPerParticipant, position: usize) -> f64 {
    let votes = f64::from(votes_per_participant.value());
    let exponent = i32::try_from(position + 1).unwrap_or(i32::MAX);
    ((votes - 0.5 * position as f64) / votes).powi(exponent)
}

/// 全ランキングを集計し、スコアの降順で結果を返す
///
/// 一度もランク付けされなかったノミネーションは結果に含まれません。
/// `nominations` に存在しない ID（集計前に取り下げられたもの）は無視します。
pub fn tally(
    rankings: &BTreeMap<ParticipantId, Vec<NominationId>>,
    nominations: &BTreeMap<NominationId, Nomination>,
    votes_per_participant: VotesPerParticipant,
) -> Vec<PollResult> {
    let mut scores: Vec<(&NominationId, f64)> = Vec::new();
    let mut index: HashMap<&NominationId, usize> = HashMap::new();

    for ranking in rankings.values() {
        for (position, nomination_id) in ranking.iter().enumerate() {
            let slot = *index.entry(nomination_id).or_insert_with(|| {
                scores.push((nomination_id, 0.0));
                scores.len() - 1
            });
            scores[slot].1 += contribution(votes_per_participant, position);
        }
    }

    let mut results: Vec<PollResult> = scores
        .into_iter()
        .filter_map(|(nomination_id, score)| {
            nominations.get(nomination_id).map(|nomination| PollResult {
                nomination_id: nomination_id.clone(),
                nomination_description: nomination.description.as_str().to_string(),
                score,
            })
        })
        .collect();

    // sort_by は安定ソートなので同点は最初に現れた順のまま
    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    results
}
