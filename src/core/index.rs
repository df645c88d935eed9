//! Naming conventions for companion index files.

use crate::core::path::IoPath;
use crate::core::types::FormatFamily;

/// How a family names the index that sits next to its primary file.
///
/// Each entry maps a primary extension to the index extensions tried for it, in
/// order. For every index extension the appended form (`x.bam.bai`) is tried before
/// the replaced form (`x.bai`); the first file that exists wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNamingRule {
    family: FormatFamily,
    conventions: Vec<(&'static str, Vec<&'static str>)>,
}

impl IndexNamingRule {
    pub fn new(family: FormatFamily) -> Self {
        Self {
            family,
            conventions: Vec::new(),
        }
    }

    /// Add a convention for files ending in `primary_extension`
    #[must_use]
    pub fn with_convention(
        mut self,
        primary_extension: &'static str,
        index_extensions: &[&'static str],
    ) -> Self {
        self.conventions
            .push((primary_extension, index_extensions.to_vec()));
        self
    }

    /// BAM (`.bai`, `.csi`) and CRAM (`.crai`)
    #[must_use]
    pub fn reads() -> Self {
        Self::new(FormatFamily::Reads)
            .with_convention("bam", &["bai", "csi"])
            .with_convention("cram", &["crai"])
    }

    /// Tabix or CSI for bgzipped VCF, CSI for BCF, Tribble `.idx` for plain VCF
    #[must_use]
    pub fn variants() -> Self {
        Self::new(FormatFamily::Variants)
            .with_convention("vcf.gz", &["tbi", "csi"])
            .with_convention("vcf.bgz", &["tbi", "csi"])
            .with_convention("bcf", &["csi"])
            .with_convention("vcf", &["idx"])
    }

    /// samtools `.fai` for FASTA
    #[must_use]
    pub fn haploid_reference() -> Self {
        Self::new(FormatFamily::HaploidReference)
            .with_convention("fa", &["fai"])
            .with_convention("fasta", &["fai"])
            .with_convention("fna", &["fai"])
            .with_convention("fa.gz", &["fai"])
            .with_convention("fasta.gz", &["fai"])
            .with_convention("fna.gz", &["fai"])
    }

    /// The preset for a family
    #[must_use]
    pub fn for_family(family: FormatFamily) -> Self {
        match family {
            FormatFamily::Reads => Self::reads(),
            FormatFamily::HaploidReference => Self::haploid_reference(),
            FormatFamily::Variants => Self::variants(),
        }
    }

    #[must_use]
    pub fn family(&self) -> FormatFamily {
        self.family
    }

    /// Every index path this rule would consider for `primary`, in the order tried
    #[must_use]
    pub fn candidates(&self, primary: &IoPath) -> Vec<IoPath> {
        let mut candidates = Vec::new();
        for (primary_ext, index_exts) in &self.conventions {
            if !primary.has_extension(primary_ext) {
                continue;
            }
            for index_ext in index_exts {
                candidates.push(primary.with_appended_extension(index_ext));
                if let Some(replaced) = primary.with_replaced_extension(primary_ext, index_ext) {
                    candidates.push(replaced);
                }
            }
            // Only the first (most specific) matching convention applies
            break;
        }
        candidates
    }

    /// The first candidate index that exists on disk
    #[must_use]
    pub fn find_index(&self, primary: &IoPath) -> Option<IoPath> {
        self.candidates(primary)
            .into_iter()
            .find(IoPath::exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(paths: &[IoPath]) -> Vec<&str> {
        paths.iter().map(IoPath::as_str).collect()
    }

    #[test]
    fn test_candidate_order() {
        let rule = IndexNamingRule::reads();
        assert_eq!(
            names(&rule.candidates(&IoPath::new("x.bam"))),
            vec!["x.bam.bai", "x.bai", "x.bam.csi", "x.csi"]
        );
        assert_eq!(
            names(&rule.candidates(&IoPath::new("x.cram"))),
            vec!["x.cram.crai", "x.crai"]
        );
        assert!(rule.candidates(&IoPath::new("x.sam")).is_empty());
    }

    #[test]
    fn test_vcf_gz_is_not_treated_as_plain_vcf() {
        let rule = IndexNamingRule::variants();
        assert_eq!(
            names(&rule.candidates(&IoPath::new("calls.vcf.gz"))),
            vec!["calls.vcf.gz.tbi", "calls.tbi", "calls.vcf.gz.csi", "calls.csi"]
        );
        assert_eq!(
            names(&rule.candidates(&IoPath::new("calls.vcf"))),
            vec!["calls.vcf.idx", "calls.idx"]
        );
    }

    #[test]
    fn test_find_index_prefers_first_existing() {
        let dir = TempDir::new().unwrap();
        let bam = dir.path().join("sample.bam");
        std::fs::write(&bam, b"").unwrap();
        std::fs::write(dir.path().join("sample.bai"), b"").unwrap();
        std::fs::write(dir.path().join("sample.bam.csi"), b"").unwrap();

        let found = IndexNamingRule::reads().find_index(&IoPath::from(&bam)).unwrap();
        assert!(found.as_str().ends_with("sample.bai"));
    }

    #[test]
    fn test_find_fasta_index() {
        let dir = TempDir::new().unwrap();
        let fasta = dir.path().join("ref.fa");
        std::fs::write(&fasta, b">chr1\nACGT\n").unwrap();
        assert!(IndexNamingRule::haploid_reference()
            .find_index(&IoPath::from(&fasta))
            .is_none());

        std::fs::write(dir.path().join("ref.fa.fai"), b"chr1\t4\t6\t4\t5\n").unwrap();
        let found = IndexNamingRule::haploid_reference()
            .find_index(&IoPath::from(&fasta))
            .unwrap();
        assert!(found.as_str().ends_with("ref.fa.fai"));
    }
}
