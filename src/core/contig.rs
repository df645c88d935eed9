use serde::{Deserialize, Serialize};

/// A single contig/sequence as described by a file's header or sequence records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contig {
    /// Sequence name (SN tag in SAM, ID in a VCF `##contig` line)
    pub name: String,

    /// Sequence length
    pub length: u64,

    /// MD5 checksum of the sequence (M5 tag in SAM)
    /// Lowercase hex, 32 characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    /// Assembly identifier (AS tag in SAM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,

    /// URI where sequence can be retrieved (UR tag in SAM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Species (SP tag in SAM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,

    /// Known alternative names for this contig (AN tag in SAM)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Contig {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            md5: None,
            assembly: None,
            uri: None,
            species: None,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_md5(mut self, md5: impl Into<String>) -> Self {
        self.md5 = Some(md5.into());
        self
    }
}

/// The ordered contigs a decoder extracted from a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDictionary {
    /// Display name of the resource this was read from (if known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub contigs: Vec<Contig>,
}

impl SequenceDictionary {
    #[must_use]
    pub fn new(contigs: Vec<Contig>) -> Self {
        Self {
            source: None,
            contigs,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    /// Fraction of contigs that carry an MD5 checksum
    #[must_use]
    pub fn md5_coverage(&self) -> f64 {
        if self.contigs.is_empty() {
            return 0.0;
        }
        let with_md5 = self.contigs.iter().filter(|c| c.md5.is_some()).count();
        #[allow(clippy::cast_precision_loss)]
        {
            with_md5 as f64 / self.contigs.len() as f64
        }
    }

    /// Total length of all contigs
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.contigs.iter().map(|c| c.length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_coverage() {
        let dict = SequenceDictionary::new(vec![
            Contig::new("chr1", 100).with_md5("6aef897c3d6ff0c78aff06ac189178dd"),
            Contig::new("chr2", 50),
        ]);
        assert_eq!(dict.len(), 2);
        assert!((dict.md5_coverage() - 0.5).abs() < f64::EPSILON);
        assert_eq!(dict.total_length(), 150);
        assert!(SequenceDictionary::default().md5_coverage().abs() < f64::EPSILON);
    }
}
