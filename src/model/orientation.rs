//! # PGP Orientation
//!
//! The phasing engine may label a sample's two strands the other way round
//! from the reference VCF the PGP values came from. Before printing a PGP
//! matrix, compare the value of the assigned pair `h1|h2` with its flip
//! `h2|h1`; if the flip is strictly larger the strands were swapped and the
//! whole matrix is printed transposed.

use crate::data::genotype_index::MAX_ALLELES;
use crate::data::marker::Marker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PgpOrientation {
    AsStored,
    Switched,
}

impl PgpOrientation {
    /// Decide the orientation of one sample's PGP vector given the pair
    /// `h1|h2` assigned to the sample. Ties keep the stored orientation.
    pub fn resolve(marker: &Marker, pgp: &[f32], h1: u8, h2: u8) -> Self {
        let value_a = pgp[marker.phased_genotype(h1, h2)];
        let value_b = pgp[marker.phased_genotype(h2, h1)];
        if value_a < value_b {
            PgpOrientation::Switched
        } else {
            PgpOrientation::AsStored
        }
    }

    pub fn is_switched(self) -> bool {
        self == PgpOrientation::Switched
    }

    /// Index into the stored PGP vector to print at output cell `a1|a2`
    #[inline]
    pub fn index(self, marker: &Marker, a1: u8, a2: u8) -> usize {
        match self {
            PgpOrientation::AsStored => marker.phased_genotype(a1, a2),
            PgpOrientation::Switched => marker.phased_genotype(a2, a1),
        }
    }

    /// The PGP matrix in output order (row-major over `a1`, then `a2`)
    pub fn matrix<'a>(self, marker: &'a Marker, pgp: &'a [f32]) -> impl Iterator<Item = f32> + 'a {
        // panels are never built for more than MAX_ALLELES alleles
        debug_assert!(marker.n_alleles() <= MAX_ALLELES);
        let n_alleles = marker.n_alleles() as u8;
        (0..n_alleles).flat_map(move |a1| {
            (0..n_alleles).map(move |a2| pgp[self.index(marker, a1, a2)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::marker::Allele;

    fn biallelic() -> Marker {
        Marker::new("1", 1, None, Allele::parse("A"), vec![Allele::parse("T")])
    }

    #[test]
    fn test_switch_transposes_matrix() {
        let marker = biallelic();
        let pgp = [0.1, 0.2, 0.7, 0.0];
        let orientation = PgpOrientation::resolve(&marker, &pgp, 0, 1);
        assert!(orientation.is_switched());
        // output cell 0|1 shows the stored 1|0 value
        assert_eq!(pgp[orientation.index(&marker, 0, 1)], 0.7);
        let printed: Vec<f32> = orientation.matrix(&marker, &pgp).collect();
        assert_eq!(printed, vec![0.1, 0.7, 0.2, 0.0]);
    }

    #[test]
    fn test_agreeing_orientation_kept() {
        let marker = biallelic();
        let pgp = [0.1, 0.2, 0.7, 0.0];
        let orientation = PgpOrientation::resolve(&marker, &pgp, 1, 0);
        assert_eq!(orientation, PgpOrientation::AsStored);
        let printed: Vec<f32> = orientation.matrix(&marker, &pgp).collect();
        assert_eq!(printed, pgp.to_vec());
    }

    #[test]
    fn test_tie_is_not_switched() {
        let marker = biallelic();
        let pgp = [0.0, 0.5, 0.5, 0.0];
        assert_eq!(
            PgpOrientation::resolve(&marker, &pgp, 0, 1),
            PgpOrientation::AsStored
        );
        // homozygous pairs compare an entry with itself
        assert_eq!(
            PgpOrientation::resolve(&marker, &pgp, 1, 1),
            PgpOrientation::AsStored
        );
    }

    #[test]
    fn test_triallelic_transpose() {
        let marker = Marker::new(
            "1",
            1,
            None,
            Allele::parse("A"),
            vec![Allele::parse("C"), Allele::parse("G")],
        );
        let pgp: Vec<f32> = (0..9).map(|i| i as f32 / 100.0).collect();
        // 2|0 (index 6) beats 0|2 (index 2)
        let orientation = PgpOrientation::resolve(&marker, &pgp, 0, 2);
        assert!(orientation.is_switched());
        let printed: Vec<f32> = orientation.matrix(&marker, &pgp).collect();
        for a1 in 0..3 {
            for a2 in 0..3 {
                assert_eq!(printed[a1 * 3 + a2], pgp[a2 * 3 + a1]);
            }
        }
    }
}
