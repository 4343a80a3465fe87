// profiles.rs - RemoveGenes and JoinProfiles

use std::path::{Path, PathBuf};

use crate::data::loaders::read_id_list;
use crate::data::AllelicMatrix;

/// Remove the loci listed in `genes_list` from a profile matrix, or keep only
/// those loci with `inverse`
pub fn remove_genes(
    input_file: &Path,
    genes_list: &Path,
    output_file: &Path,
    inverse: bool,
) -> Result<AllelicMatrix, String> {
    let matrix = AllelicMatrix::from_tsv(input_file)?;
    let loci = read_id_list(genes_list)?;
    let result = matrix.remove_loci(&loci, inverse);
    let action = if inverse { "Kept" } else { "Removed" };
    let affected = if inverse {
        result.loci_names.len()
    } else {
        matrix.loci_names.len() - result.loci_names.len()
    };
    println!("🧹 {} {} of {} loci", action, affected, matrix.loci_names.len());

    result.to_tsv(output_file)?;
    println!("✅ Profiles written to {}", output_file.display());
    Ok(result)
}

/// Join the profile matrices of several AlleleCall runs
pub fn join_profiles(
    profiles: &[PathBuf],
    output_file: &Path,
    common: bool,
) -> Result<AllelicMatrix, String> {
    let matrices = profiles
        .iter()
        .map(|p| AllelicMatrix::from_tsv(p))
        .collect::<Result<Vec<_>, String>>()?;
    let joined = AllelicMatrix::join(&matrices, common)?;
    println!(
        "🔗 Joined {} matrices: {} samples, {} loci",
        matrices.len(),
        joined.samples.len(),
        joined.loci_names.len()
    );
    joined.to_tsv(output_file)?;
    println!("✅ Profiles written to {}", output_file.display());
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_remove_genes_inverse() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("profiles.tsv");
        fs::write(&input, "FILE\tl1\tl2\tl3\ng1\t1\t2\t3\n").unwrap();
        let list = dir.path().join("genes.txt");
        fs::write(&list, "l2.fasta\nl3\n").unwrap();

        let output = dir.path().join("removed.tsv");
        let removed = remove_genes(&input, &list, &output, false).unwrap();
        assert_eq!(removed.loci_names, vec!["l1"]);
        assert_eq!(fs::read_to_string(&output).unwrap(), "FILE\tl1\ng1\t1\n");

        let kept = remove_genes(&input, &list, &output, true).unwrap();
        assert_eq!(kept.loci_names, vec!["l2", "l3"]);
    }

    #[test]
    fn test_join_profiles_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.tsv");
        let second = dir.path().join("b.tsv");
        fs::write(&first, "FILE\tl1\tl2\ng1\t1\t2\n").unwrap();
        fs::write(&second, "FILE\tl2\tl3\ng2\tINF-4\t1\n").unwrap();

        let output = dir.path().join("joined.tsv");
        join_profiles(&[first.clone(), second.clone()], &output, false).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "FILE\tl1\tl2\tl3\ng1\t1\t2\tLNF\ng2\tLNF\tINF-4\t1\n"
        );

        let joined = join_profiles(&[first, second], &output, true).unwrap();
        assert_eq!(joined.loci_names, vec!["l2"]);
    }
}
