//! The fourteen outcome/missingness model variants.

use crate::error::ModelError;

/// Outcome distribution family, independent of the missingness treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeFamily {
    /// Dichotomous outcomes with a logit link (classic two-parameter IRT).
    Binary,
    /// Ordinal outcomes with shared cutpoints across items (rating scale).
    RatingScale,
    /// Ordinal outcomes with per-item cutpoints (graded response).
    Grm,
    /// Count outcomes with a log link.
    Poisson,
    /// Continuous outcomes with an identity link.
    Normal,
    /// Positive continuous outcomes, modelled on the log scale.
    Lognormal,
    /// Dichotomous outcomes driven by latent distance rather than projection.
    LatentSpace,
}

/// One of the fourteen model variants: seven outcome families, each in a
/// listwise-deletion form and a missingness-inflated (hurdle) form.
///
/// The numeric codes 1..=14 match the upstream convention: odd codes are
/// non-inflated, the following even code is the inflated twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// 1: binary, missing responses dropped.
    Binary,
    /// 2: binary with a missingness hurdle.
    BinaryInflated,
    /// 3: rating-scale ordinal, missing responses dropped.
    RatingScale,
    /// 4: rating-scale ordinal with a missingness hurdle.
    RatingScaleInflated,
    /// 5: graded-response ordinal, missing responses dropped.
    Grm,
    /// 6: graded-response ordinal with a missingness hurdle.
    GrmInflated,
    /// 7: Poisson counts, missing responses dropped.
    Poisson,
    /// 8: Poisson counts with a missingness hurdle.
    PoissonInflated,
    /// 9: normal outcomes, missing responses dropped.
    Normal,
    /// 10: normal outcomes with a missingness hurdle.
    NormalInflated,
    /// 11: lognormal outcomes, missing responses dropped.
    Lognormal,
    /// 12: lognormal outcomes with a missingness hurdle.
    LognormalInflated,
    /// 13: latent-space binary, missing responses dropped.
    LatentSpace,
    /// 14: latent-space binary with a missingness hurdle.
    LatentSpaceInflated,
}

impl ModelType {
    /// All fourteen variants in code order.
    pub const ALL: [ModelType; 14] = [
        ModelType::Binary,
        ModelType::BinaryInflated,
        ModelType::RatingScale,
        ModelType::RatingScaleInflated,
        ModelType::Grm,
        ModelType::GrmInflated,
        ModelType::Poisson,
        ModelType::PoissonInflated,
        ModelType::Normal,
        ModelType::NormalInflated,
        ModelType::Lognormal,
        ModelType::LognormalInflated,
        ModelType::LatentSpace,
        ModelType::LatentSpaceInflated,
    ];

    /// Resolves a numeric model code (1..=14) to its variant.
    pub fn from_code(code: u8) -> Result<Self, ModelError> {
        match code {
            1..=14 => Ok(Self::ALL[(code - 1) as usize]),
            _ => Err(ModelError::UnknownModelCode { code }),
        }
    }

    /// Returns the numeric code (1..=14) of this variant.
    pub fn code(&self) -> u8 {
        match self {
            ModelType::Binary => 1,
            ModelType::BinaryInflated => 2,
            ModelType::RatingScale => 3,
            ModelType::RatingScaleInflated => 4,
            ModelType::Grm => 5,
            ModelType::GrmInflated => 6,
            ModelType::Poisson => 7,
            ModelType::PoissonInflated => 8,
            ModelType::Normal => 9,
            ModelType::NormalInflated => 10,
            ModelType::Lognormal => 11,
            ModelType::LognormalInflated => 12,
            ModelType::LatentSpace => 13,
            ModelType::LatentSpaceInflated => 14,
        }
    }

    /// Returns the outcome family of this variant.
    pub fn family(&self) -> OutcomeFamily {
        match self {
            ModelType::Binary | ModelType::BinaryInflated => OutcomeFamily::Binary,
            ModelType::RatingScale | ModelType::RatingScaleInflated => OutcomeFamily::RatingScale,
            ModelType::Grm | ModelType::GrmInflated => OutcomeFamily::Grm,
            ModelType::Poisson | ModelType::PoissonInflated => OutcomeFamily::Poisson,
            ModelType::Normal | ModelType::NormalInflated => OutcomeFamily::Normal,
            ModelType::Lognormal | ModelType::LognormalInflated => OutcomeFamily::Lognormal,
            ModelType::LatentSpace | ModelType::LatentSpaceInflated => OutcomeFamily::LatentSpace,
        }
    }

    /// True for the missingness-inflated (hurdle) variants.
    pub fn inflated(&self) -> bool {
        self.code() % 2 == 0
    }

    /// True for families whose outcomes are ordinal categories.
    pub fn ordinal(&self) -> bool {
        matches!(
            self.family(),
            OutcomeFamily::RatingScale | OutcomeFamily::Grm
        )
    }
}
