use biomatch_template::Template;

use crate::plugin::Distance;

/// Negative euclidean distance, so that larger means more similar.
/// Vectors of different lengths are compared over their common prefix.
pub struct L2;

impl Distance for L2 {
    fn score(&self, target: &Template, query: &Template) -> f32 {
        let sq: f32 = target
            .data
            .iter()
            .zip(&query.data)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        // No negative zero for identical vectors.
        match sq.sqrt() {
            d if d == 0.0 => 0.0,
            d => -d,
        }
    }
}

/// Cosine similarity. Zero vectors score 0.
pub struct Cosine;

impl Distance for Cosine {
    fn score(&self, target: &Template, query: &Template) -> f32 {
        let mut dot = 0f32;
        let mut na = 0f32;
        let mut nb = 0f32;
        for (a, b) in target.data.iter().zip(&query.data) {
            dot += a * b;
            na += a * a;
            nb += b * b;
        }
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na.sqrt() * nb.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomatch_template::File;

    fn t(data: Vec<f32>) -> Template {
        Template::new(File::new("x"), data)
    }

    #[test]
    fn l2_is_negative_distance() {
        assert_eq!(L2.score(&t(vec![0.0, 0.0]), &t(vec![3.0, 4.0])), -5.0);
        assert_eq!(L2.score(&t(vec![1.0]), &t(vec![1.0])), 0.0);
    }

    #[test]
    fn cosine_range() {
        assert_eq!(Cosine.score(&t(vec![1.0, 0.0]), &t(vec![2.0, 0.0])), 1.0);
        assert_eq!(Cosine.score(&t(vec![1.0, 0.0]), &t(vec![0.0, 1.0])), 0.0);
        assert_eq!(Cosine.score(&t(vec![0.0]), &t(vec![1.0])), 0.0);
    }
}
