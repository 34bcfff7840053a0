//! Normalized long-format response data.

use std::collections::BTreeMap;

use crate::error::DataError;

/// Normalized response data: one record per observed (or deliberately
/// missing) person × item × time cell, with name↔index maps.
///
/// All index vectors are parallel and the same length. Missing responses are
/// kept as rows with `missing[i] == true` and a NaN outcome, so the inflated
/// model variants can treat absence as informative; the non-inflated
/// variants drop them at likelihood time.
#[derive(Debug, Clone)]
pub struct ResponseData {
    person_names: Vec<String>,
    item_names: Vec<String>,
    group_names: Vec<String>,
    time_values: Vec<i64>,
    person_group: Vec<usize>,
    person_idx: Vec<usize>,
    item_idx: Vec<usize>,
    time_idx: Vec<usize>,
    outcome: Vec<f64>,
    missing: Vec<bool>,
}

impl ResponseData {
    /// Builds a `ResponseData` from pre-indexed parts, validating shape.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] when the parallel vectors differ in
    /// length, an index is out of range, or the data is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        person_names: Vec<String>,
        item_names: Vec<String>,
        group_names: Vec<String>,
        time_values: Vec<i64>,
        person_group: Vec<usize>,
        person_idx: Vec<usize>,
        item_idx: Vec<usize>,
        time_idx: Vec<usize>,
        outcome: Vec<f64>,
        missing: Vec<bool>,
    ) -> Result<Self, DataError> {
        let mut problems: Vec<String> = Vec::new();

        let n = person_idx.len();
        if n == 0 {
            problems.push("no response rows".to_string());
        }
        for (name, len) in [
            ("item_idx", item_idx.len()),
            ("time_idx", time_idx.len()),
            ("outcome", outcome.len()),
            ("missing", missing.len()),
        ] {
            if len != n {
                problems.push(format!("{name} has length {len}, expected {n}"));
            }
        }
        if person_group.len() != person_names.len() {
            problems.push(format!(
                "person_group has length {}, expected {}",
                person_group.len(),
                person_names.len()
            ));
        }
        if person_idx.iter().any(|&p| p >= person_names.len()) {
            problems.push("person index out of range".to_string());
        }
        if item_idx.iter().any(|&j| j >= item_names.len()) {
            problems.push("item index out of range".to_string());
        }
        let n_time = time_values.len().max(1);
        if time_idx.iter().any(|&t| t >= n_time) {
            problems.push("time index out of range".to_string());
        }
        if person_group.iter().any(|&g| g >= group_names.len().max(1)) {
            problems.push("group index out of range".to_string());
        }

        if !problems.is_empty() {
            return Err(DataError::Validation {
                count: problems.len(),
                details: problems.join("; "),
            });
        }

        Ok(Self {
            person_names,
            item_names,
            group_names,
            time_values,
            person_group,
            person_idx,
            item_idx,
            time_idx,
            outcome,
            missing,
        })
    }

    /// Number of response rows (observed plus recorded-missing).
    pub fn len(&self) -> usize {
        self.person_idx.len()
    }

    /// True when there are no response rows.
    pub fn is_empty(&self) -> bool {
        self.person_idx.is_empty()
    }

    /// Number of distinct persons.
    pub fn n_persons(&self) -> usize {
        self.person_names.len()
    }

    /// Number of distinct items.
    pub fn n_items(&self) -> usize {
        self.item_names.len()
    }

    /// Number of distinct time points (1 for untimed data).
    pub fn n_time(&self) -> usize {
        self.time_values.len().max(1)
    }

    /// Person display names, in index order.
    pub fn person_names(&self) -> &[String] {
        &self.person_names
    }

    /// Item display names, in index order.
    pub fn item_names(&self) -> &[String] {
        &self.item_names
    }

    /// Group display names, in index order.
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Raw time values (sorted, deduplicated), in index order.
    pub fn time_values(&self) -> &[i64] {
        &self.time_values
    }

    /// Group index of each person.
    pub fn person_group(&self) -> &[usize] {
        &self.person_group
    }

    /// Per-row person indices.
    pub fn person_idx(&self) -> &[usize] {
        &self.person_idx
    }

    /// Per-row item indices.
    pub fn item_idx(&self) -> &[usize] {
        &self.item_idx
    }

    /// Per-row time indices.
    pub fn time_idx(&self) -> &[usize] {
        &self.time_idx
    }

    /// Per-row outcome values (NaN where missing).
    pub fn outcome(&self) -> &[f64] {
        &self.outcome
    }

    /// Per-row missing mask.
    pub fn missing(&self) -> &[bool] {
        &self.missing
    }

    /// Resolves a person name to its index.
    pub fn person_index(&self, name: &str) -> Option<usize> {
        self.person_names.iter().position(|n| n == name)
    }

    /// Group display name of each person, in person index order.
    pub fn person_group_names(&self) -> Vec<String> {
        self.person_group
            .iter()
            .map(|&g| self.group_names[g].clone())
            .collect()
    }

    /// Mean observed outcome per person (NaN if a person has no observed
    /// responses). Used for deterministic engine initialization.
    pub fn person_mean_outcome(&self) -> Vec<f64> {
        let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for i in 0..self.len() {
            if !self.missing[i] {
                let e = sums.entry(self.person_idx[i]).or_insert((0.0, 0));
                e.0 += self.outcome[i];
                e.1 += 1;
            }
        }
        (0..self.n_persons())
            .map(|p| match sums.get(&p) {
                Some(&(s, c)) if c > 0 => s / c as f64,
                _ => f64::NAN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ResponseData {
        ResponseData::from_parts(
            vec!["a".into(), "b".into()],
            vec!["v1".into(), "v2".into()],
            vec!["all".into()],
            vec![],
            vec![0, 0],
            vec![0, 0, 1, 1],
            vec![0, 1, 0, 1],
            vec![0, 0, 0, 0],
            vec![1.0, 0.0, 0.0, f64::NAN],
            vec![false, false, false, true],
        )
        .unwrap()
    }

    #[test]
    fn dimensions() {
        let d = small();
        assert_eq!(d.len(), 4);
        assert_eq!(d.n_persons(), 2);
        assert_eq!(d.n_items(), 2);
        assert_eq!(d.n_time(), 1);
    }

    #[test]
    fn person_lookup() {
        let d = small();
        assert_eq!(d.person_index("b"), Some(1));
        assert_eq!(d.person_index("zz"), None);
    }

    #[test]
    fn rejects_empty() {
        let res = ResponseData::from_parts(
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(res, Err(DataError::Validation { .. })));
    }

    #[test]
    fn rejects_out_of_range_person() {
        let res = ResponseData::from_parts(
            vec!["a".into()],
            vec!["v1".into()],
            vec!["all".into()],
            vec![],
            vec![0],
            vec![5],
            vec![0],
            vec![0],
            vec![1.0],
            vec![false],
        );
        assert!(matches!(res, Err(DataError::Validation { .. })));
    }

    #[test]
    fn rejects_length_mismatch() {
        let res = ResponseData::from_parts(
            vec!["a".into()],
            vec!["v1".into()],
            vec!["all".into()],
            vec![],
            vec![0],
            vec![0, 0],
            vec![0],
            vec![0],
            vec![1.0],
            vec![false],
        );
        assert!(matches!(res, Err(DataError::Validation { .. })));
    }

    #[test]
    fn person_group_names_follow_person_order() {
        let d = ResponseData::from_parts(
            vec!["a".into(), "b".into()],
            vec!["v1".into()],
            vec!["red".into(), "blue".into()],
            vec![],
            vec![0, 1],
            vec![0, 1],
            vec![0, 0],
            vec![0, 0],
            vec![1.0, 0.0],
            vec![false, false],
        )
        .unwrap();
        assert_eq!(
            d.person_group_names(),
            vec!["red".to_string(), "blue".to_string()]
        );
    }

    #[test]
    fn person_means_skip_missing() {
        let d = small();
        let means = d.person_mean_outcome();
        assert_eq!(means[0], 0.5);
        assert_eq!(means[1], 0.0); // the NaN row is masked
    }

}
