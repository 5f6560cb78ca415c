// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Splits a scanned image folder into two subsets:
//   - Training set:   used to update model weights
//   - Validation set: monitored by early stopping and checkpointing
//
// The split is deterministic and made per class, the same way
// Keras applies `validation_split` in flow_from_directory:
//
//   for each class with n sorted files:
//       cut        = floor(validation_split * n)
//       validation = files[0 .. cut]
//       training   = files[cut .. n]
//
// Splitting per class keeps the class balance identical in
// both subsets. Running twice on the same directory always gives
// the same partition, so a resumed run validates on the same images.
//
// Reference: Rust Book §8 (Vectors)

use anyhow::{bail, Result};

use crate::domain::image_sample::{ImageFolder, ImageSample, Subset};

/// Return the samples of one subset of `folder`.
///
/// # Arguments
/// * `folder`           - Scan result with sorted files per class
/// * `validation_split` - Fraction held out for validation, in [0, 1)
/// * `subset`           - Which side of the split to return
pub fn select_subset(
    folder:           &ImageFolder,
    validation_split: f64,
    subset:           Subset,
) -> Result<Vec<ImageSample>> {
    if !(0.0..1.0).contains(&validation_split) {
        bail!("validation_split must be in [0, 1), got {}", validation_split);
    }

    let mut samples = Vec::new();

    for (label, files) in folder.files_by_class.iter().enumerate() {
        let n   = files.len();
        let cut = ((n as f64) * validation_split).floor() as usize;

        let range = match subset {
            Subset::Validation => 0..cut,
            Subset::Training   => cut..n,
        };

        samples.extend(
            files[range]
                .iter()
                .map(|path| ImageSample::new(path.clone(), label)),
        );
    }

    tracing::info!(
        "Found {} images belonging to {} classes ({} subset).",
        samples.len(),
        folder.num_classes(),
        subset,
    );

    Ok(samples)
}

/// Convenience wrapper returning (training, validation)
pub fn split_train_val(
    folder:           &ImageFolder,
    validation_split: f64,
) -> Result<(Vec<ImageSample>, Vec<ImageSample>)> {
    let train = select_subset(folder, validation_split, Subset::Training)?;
    let val   = select_subset(folder, validation_split, Subset::Validation)?;
    Ok((train, val))
}

/// Number of batches one pass over `len` samples takes
pub fn num_batches(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    len.div_ceil(batch_size)
}
