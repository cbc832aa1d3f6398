use crate::media::MediaError;
use image::{
    DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
    metadata::Orientation,
};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Re-encodes `input` into `output_dir` under the same file name, off the
/// async runtime.
pub async fn transcode(
    input: PathBuf,
    output_dir: PathBuf,
    jpeg_quality: u8,
) -> Result<PathBuf, MediaError> {
    tokio::task::spawn_blocking(move || transcode_file(&input, &output_dir, jpeg_quality))
        .await
        .map_err(|err| MediaError::Transcode(err.to_string()))?
}

/// JPEG output is baseline (never progressive), PNG and WebP output are
/// lossless. The embedded ICC profile and EXIF block (orientation included)
/// are carried over when the encoder accepts them. Formats without metadata
/// support get the orientation baked into the pixels instead.
pub fn transcode_file(
    input: &Path,
    output_dir: &Path,
    jpeg_quality: u8,
) -> Result<PathBuf, MediaError> {
    let file_name = input.file_name().ok_or_else(|| {
        MediaError::Transcode(format!("no file name in {}", input.display()))
    })?;
    std::fs::create_dir_all(output_dir).map_err(|err| MediaError::Write(err.to_string()))?;
    let output = output_dir.join(file_name);

    let reader = ImageReader::open(input)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| MediaError::Transcode(format!("{}: {err}", input.display())))?;
    let format = ImageFormat::from_path(&output)
        .ok()
        .or(reader.format())
        .ok_or_else(|| {
            MediaError::Transcode(format!("unknown image format: {}", input.display()))
        })?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|err| MediaError::Transcode(format!("{}: {err}", input.display())))?;
    let metadata = SourceMetadata {
        icc_profile: decoder.icc_profile().ok().flatten(),
        exif: decoder.exif_metadata().ok().flatten(),
    };
    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|err| MediaError::Transcode(format!("{}: {err}", input.display())))?;

    let result = match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(open_writer(&output)?, jpeg_quality);
            metadata.attach(&mut encoder);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        ImageFormat::Png => {
            let mut encoder = PngEncoder::new_with_quality(
                open_writer(&output)?,
                CompressionType::Best,
                FilterType::Adaptive,
            );
            metadata.attach(&mut encoder);
            image.write_with_encoder(encoder)
        }
        ImageFormat::WebP => {
            let mut encoder = WebPEncoder::new_lossless(open_writer(&output)?);
            metadata.attach(&mut encoder);
            DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)
        }
        other => {
            let orientation = metadata.orientation();
            if orientation != Orientation::NoTransforms {
                image.apply_orientation(orientation);
            }
            if metadata.is_present() {
                warn!(target = "ocm_migrate.transcode", format = ?other, "image_metadata_dropped");
            }
            image.save_with_format(&output, other)
        }
    };
    result.map_err(|err| MediaError::Transcode(format!("{}: {err}", output.display())))?;

    debug!(
        target = "ocm_migrate.transcode",
        input = %input.display(),
        output = %output.display(),
        format = ?format,
        "image transcoded"
    );
    Ok(output)
}

fn open_writer(path: &Path) -> Result<BufWriter<File>, MediaError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| MediaError::Write(err.to_string()))
}

/// Metadata blocks read from the source before decoding.
struct SourceMetadata {
    icc_profile: Option<Vec<u8>>,
    exif: Option<Vec<u8>>,
}

impl SourceMetadata {
    fn is_present(&self) -> bool {
        self.icc_profile.is_some() || self.exif.is_some()
    }

    fn orientation(&self) -> Orientation {
        self.exif
            .as_deref()
            .and_then(Orientation::from_exif_chunk)
            .unwrap_or(Orientation::NoTransforms)
    }

    fn attach(&self, encoder: &mut impl ImageEncoder) {
        if let Some(profile) = &self.icc_profile
            && encoder.set_icc_profile(profile.clone()).is_err()
        {
            warn!(target = "ocm_migrate.transcode", "icc_profile_dropped");
        }
        if let Some(exif) = &self.exif
            && encoder.set_exif_metadata(exif.clone()).is_err()
        {
            warn!(target = "ocm_migrate.transcode", "exif_dropped");
        }
    }
}
