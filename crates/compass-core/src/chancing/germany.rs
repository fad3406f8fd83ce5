/// Germany formula: Abitur grade against the course's numerus clausus
/// cutoff. Grades run 1.0 (best) to 4.0; admission is mostly mechanical.
use crate::chancing::types::*;
use crate::domain::{College, Factor, ProfileSnapshot, Region};

pub fn compute(snapshot: &ProfileSnapshot, college: &College) -> ChanceComputation {
    let mut factors = Vec::new();

    // Dispatch guarantees the grade is present.
    let abitur = snapshot.profile.regional.abitur_grade.unwrap_or(4.0);

    let chance = match college.nc_cutoff {
        Some(nc) => {
            // Positive margin (abitur better than cutoff) helps linearly.
            let margin = nc - abitur;
            let value = DE_BASE + DE_POINTS_PER_GRADE * margin;
            factors.push(Factor::new(
                "abitur_vs_nc",
                1.0,
                DE_POINTS_PER_GRADE * margin,
                format!("abitur {:.1} vs NC {:.1}", abitur, nc),
            ));
            value
        }
        None => {
            factors.push(Factor::new(
                "unrestricted_course",
                1.0,
                DE_UNRESTRICTED_CHANCE,
                "no NC restriction",
            ));
            DE_UNRESTRICTED_CHANCE
        }
    };

    ChanceComputation {
        chance_percent: chance,
        category: regional_category(chance),
        region: Region::Germany,
        factors,
    }
}
