use crate::core::similarity::cosine_similarity;
use crate::error::MatchingError;
use crate::models::{
    ExpertisePolicy, MatchingParams, MenteeRecord, MentorRecord, PairScore, ProfileRole,
    SemanticNormalization,
};

/// Computes compatibility for a mentee-mentor pair
///
/// Scoring formula:
/// final = (
///     semantic_score * semantic_weight +    # embedding closeness
///     expertise_score * expertise_weight    # mentor level minus mentee level, bucketed
/// )
///
/// Every component and the combined score lie in [0, 1]. Out-of-range values
/// are clamped: negative cosine similarity under `Clamp` normalization, and
/// floating-point drift just past either bound.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    semantic_weight: f64,
    expertise_weight: f64,
    expertise: ExpertisePolicy,
    normalization: SemanticNormalization,
    embedding_dimension: usize,
}

impl ScoreCalculator {
    pub fn new(params: &MatchingParams) -> Self {
        Self {
            semantic_weight: params.semantic_weight,
            expertise_weight: params.expertise_weight,
            expertise: params.expertise.clone(),
            normalization: params.semantic_normalization,
            embedding_dimension: params.embedding_dimension,
        }
    }

    /// Semantic score in [0, 1] from the two profiles' embeddings
    ///
    /// Fails rather than returning 0 when either side cannot be scored, so
    /// callers can tell "dissimilar" apart from "unscored".
    pub fn semantic_score(
        &self,
        mentee: &MenteeRecord,
        mentor: &MentorRecord,
    ) -> Result<f64, MatchingError> {
        let mentee_vec = self.usable_embedding(
            ProfileRole::Mentee,
            &mentee.mentee_id,
            mentee.embedding.as_deref(),
        )?;
        let mentor_vec = self.usable_embedding(
            ProfileRole::Mentor,
            &mentor.mentor_id,
            mentor.embedding.as_deref(),
        )?;

        let cosine = cosine_similarity(mentee_vec, mentor_vec).ok_or_else(|| {
            // Only one side is at fault; report whichever has no direction
            let (role, profile_id) = if is_degenerate(mentee_vec) {
                (ProfileRole::Mentee, mentee.mentee_id.clone())
            } else {
                (ProfileRole::Mentor, mentor.mentor_id.clone())
            };
            MatchingError::DegenerateEmbedding { role, profile_id }
        })?;

        let normalized = match self.normalization {
            SemanticNormalization::Clamp => cosine,
            SemanticNormalization::Rescale => (cosine + 1.0) / 2.0,
        };

        Ok(clamp_unit(normalized))
    }

    /// Expertise score from the level gap (`mentor_level - mentee_level`)
    #[inline]
    pub fn expertise_score(&self, mentee_level: u8, mentor_level: u8) -> f64 {
        let gap = i32::from(mentor_level) - i32::from(mentee_level);
        clamp_unit(self.expertise.score(gap))
    }

    /// Weighted combination of the two component scores
    #[inline]
    pub fn combine(&self, semantic_score: f64, expertise_score: f64) -> f64 {
        clamp_unit(semantic_score * self.semantic_weight + expertise_score * self.expertise_weight)
    }

    /// Full score breakdown for one pair
    pub fn score_pair(
        &self,
        mentee: &MenteeRecord,
        mentor: &MentorRecord,
    ) -> Result<PairScore, MatchingError> {
        let semantic_score = self.semantic_score(mentee, mentor)?;
        let expertise_score = self.expertise_score(mentee.interest_level, mentor.expertise_level);
        let final_score = self.combine(semantic_score, expertise_score);

        Ok(PairScore {
            mentee_id: mentee.mentee_id.clone(),
            mentor_id: mentor.mentor_id.clone(),
            semantic_score,
            expertise_score,
            final_score,
        })
    }

    fn usable_embedding<'a>(
        &self,
        role: ProfileRole,
        profile_id: &str,
        embedding: Option<&'a [f32]>,
    ) -> Result<&'a [f32], MatchingError> {
        match embedding {
            Some(vector) if vector.len() == self.embedding_dimension => Ok(vector),
            other => Err(MatchingError::MissingEmbedding {
                role,
                profile_id: profile_id.to_string(),
                expected_dimension: self.embedding_dimension,
                found: other.map(<[f32]>::len).unwrap_or(0),
            }),
        }
    }
}

#[inline]
fn is_degenerate(vector: &[f32]) -> bool {
    vector.iter().any(|v| !v.is_finite()) || vector.iter().all(|&v| v == 0.0)
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!("NaN score clamped to 0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        tracing::trace!("Score {} clamped into [0, 1]", value);
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentor(id: &str, level: u8, embedding: Option<Vec<f32>>) -> MentorRecord {
        MentorRecord {
            mentor_id: id.to_string(),
            expertise_area: "data science".to_string(),
            expertise_level: level,
            max_mentee_capacity: 2,
            current_mentee_count: 0,
            embedding,
        }
    }

    fn mentee(id: &str, level: u8, embedding: Option<Vec<f32>>) -> MenteeRecord {
        MenteeRecord {
            mentee_id: id.to_string(),
            main_interest: "data science".to_string(),
            interest_level: level,
            embedding,
        }
    }

    fn calculator(dimension: usize) -> ScoreCalculator {
        ScoreCalculator::new(&MatchingParams {
            embedding_dimension: dimension,
            ..MatchingParams::default()
        })
    }

    #[test]
    fn test_identical_embeddings_score_one() {
        let calc = calculator(3);
        let v = vec![0.3_f32, 0.1, -0.7];
        let score = calc
            .semantic_score(&mentee("a", 2, Some(v.clone())), &mentor("x", 4, Some(v)))
            .unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_opposite_embeddings() {
        let calc = calculator(2);
        let score = calc
            .semantic_score(
                &mentee("a", 2, Some(vec![1.0, 0.0])),
                &mentor("x", 4, Some(vec![-1.0, 0.0])),
            )
            .unwrap();
        assert_eq!(score, 0.0);

        let rescaled = ScoreCalculator::new(&MatchingParams {
            embedding_dimension: 2,
            semantic_normalization: SemanticNormalization::Rescale,
            ..MatchingParams::default()
        });
        let score = rescaled
            .semantic_score(
                &mentee("a", 2, Some(vec![1.0, 0.0])),
                &mentor("x", 4, Some(vec![0.0, 1.0])),
            )
            .unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_embedding_is_an_error() {
        let calc = calculator(2);
        let err = calc
            .semantic_score(&mentee("a", 2, None), &mentor("x", 4, Some(vec![1.0, 0.0])))
            .unwrap_err();
        assert!(matches!(
            err,
            MatchingError::MissingEmbedding { role: ProfileRole::Mentee, .. }
        ));

        // wrong dimension counts as missing
        let err = calc
            .semantic_score(
                &mentee("a", 2, Some(vec![1.0, 0.0])),
                &mentor("x", 4, Some(vec![1.0, 0.0, 0.0])),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            MatchingError::MissingEmbedding { role: ProfileRole::Mentor, found: 3, .. }
        ));
    }

    #[test]
    fn test_zero_vector_is_degenerate() {
        let calc = calculator(2);
        let err = calc
            .semantic_score(
                &mentee("a", 2, Some(vec![1.0, 0.0])),
                &mentor("x", 4, Some(vec![0.0, 0.0])),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            MatchingError::DegenerateEmbedding { role: ProfileRole::Mentor, .. }
        ));
    }

    #[test]
    fn test_expertise_score_uses_gap() {
        let calc = calculator(2);
        assert_eq!(calc.expertise_score(2, 4), 1.0);
        assert_eq!(calc.expertise_score(2, 5), 1.0);
        assert_eq!(calc.expertise_score(2, 3), 0.3);
        assert_eq!(calc.expertise_score(4, 2), 0.3);
    }

    #[test]
    fn test_final_score_is_weighted_sum() {
        let calc = calculator(2);
        let pair = calc
            .score_pair(
                &mentee("a", 1, Some(vec![1.0, 1.0])),
                &mentor("x", 3, Some(vec![1.0, 0.0])),
            )
            .unwrap();

        let expected = 0.8 * pair.semantic_score + 0.2 * pair.expertise_score;
        assert!((pair.final_score - expected).abs() < 1e-6);
        assert!(pair.final_score >= 0.0 && pair.final_score <= 1.0);
        assert_eq!(pair.expertise_score, 1.0);
    }

    #[test]
    fn test_combine_clamps() {
        let calc = calculator(2);
        assert_eq!(calc.combine(1.0, 1.0), 1.0);
        assert_eq!(calc.combine(0.0, 0.0), 0.0);
        assert_eq!(calc.combine(f64::NAN, 0.5), 0.0);
    }
}
