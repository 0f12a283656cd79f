//! Ad placement parameters for one auction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing request parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    /// The placement has no config id.
    #[error("config id must not be empty")]
    EmptyConfigId,

    /// A requested size has a zero dimension.
    #[error("invalid ad size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: u32, height: u32 },

    /// A size string could not be parsed as `WIDTHxHEIGHT`.
    #[error("cannot parse ad size '{0}', expected WIDTHxHEIGHT")]
    UnparsableSize(String),
}

/// Kind of placement being auctioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    Banner,
    Interstitial,
    Native,
}

/// A requested creative size in density-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdSize {
    width: u32,
    height: u32,
}

impl AdSize {
    /// Create a size; both dimensions must be positive.
    pub fn new(width: u32, height: u32) -> Result<Self, ParamsError> {
        if width == 0 || height == 0 {
            return Err(ParamsError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for AdSize {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || ParamsError::UnparsableSize(s.to_string());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(unparsable)?;
        let width = w.trim().parse().map_err(|_| unparsable())?;
        let height = h.trim().parse().map_err(|_| unparsable())?;
        Self::new(width, height)
    }
}

/// Native protocol version of the embedded native request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeRequestVersion {
    #[default]
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
}

impl NativeRequestVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeRequestVersion::V1_1 => "1.1",
            NativeRequestVersion::V1_2 => "1.2",
        }
    }
}

/// Native asset kinds that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeAssetKind {
    Title,
    IconImage,
    MainImage,
    Sponsored,
    Description,
    Rating,
    Likes,
    Downloads,
    Price,
    SalePrice,
    Phone,
    Address,
    AdditionalDescription,
    DisplayUrl,
    CtaText,
}

/// Wire-level shape of a native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAssetClass {
    Title,
    /// Image asset with its image type id.
    Image(u8),
    /// Data asset with its data type id.
    Data(u8),
}

impl NativeAssetKind {
    pub fn class(&self) -> NativeAssetClass {
        match self {
            NativeAssetKind::Title => NativeAssetClass::Title,
            NativeAssetKind::IconImage => NativeAssetClass::Image(1),
            NativeAssetKind::MainImage => NativeAssetClass::Image(3),
            NativeAssetKind::Sponsored => NativeAssetClass::Data(1),
            NativeAssetKind::Description => NativeAssetClass::Data(2),
            NativeAssetKind::Rating => NativeAssetClass::Data(3),
            NativeAssetKind::Likes => NativeAssetClass::Data(4),
            NativeAssetKind::Downloads => NativeAssetClass::Data(5),
            NativeAssetKind::Price => NativeAssetClass::Data(6),
            NativeAssetKind::SalePrice => NativeAssetClass::Data(7),
            NativeAssetKind::Phone => NativeAssetClass::Data(8),
            NativeAssetKind::Address => NativeAssetClass::Data(9),
            NativeAssetKind::AdditionalDescription => NativeAssetClass::Data(10),
            NativeAssetKind::DisplayUrl => NativeAssetClass::Data(11),
            NativeAssetKind::CtaText => NativeAssetClass::Data(12),
        }
    }
}

/// Per-asset parameters. Which fields matter depends on the asset class:
/// titles and data assets use `len`, images use the sizes and mimes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeAssetParams {
    pub required: bool,
    pub len: Option<u32>,
    pub w: u32,
    pub h: u32,
    pub wmin: u32,
    pub hmin: u32,
    pub mimes: Vec<String>,
}

impl NativeAssetParams {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn with_len(mut self, len: u32) -> Self {
        self.len = Some(len);
        self
    }

    pub fn with_size(mut self, w: u32, h: u32) -> Self {
        self.w = w;
        self.h = h;
        self
    }

    pub fn with_min_size(mut self, wmin: u32, hmin: u32) -> Self {
        self.wmin = wmin;
        self.hmin = hmin;
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mimes.push(mime.into());
        self
    }
}

/// Immutable description of one ad placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    config_id: String,
    ad_type: AdType,
    sizes: BTreeSet<AdSize>,
    keywords: Vec<String>,
    native_assets: BTreeMap<NativeAssetKind, NativeAssetParams>,
    native_version: NativeRequestVersion,
}

impl RequestParams {
    /// Parameters for a banner placement with the given sizes.
    pub fn banner(
        config_id: impl Into<String>,
        sizes: impl IntoIterator<Item = AdSize>,
    ) -> Result<Self, ParamsError> {
        let mut params = Self::new(config_id, AdType::Banner)?;
        params.sizes = sizes.into_iter().collect();
        Ok(params)
    }

    /// Parameters for an interstitial; its size comes from the display.
    pub fn interstitial(config_id: impl Into<String>) -> Result<Self, ParamsError> {
        Self::new(config_id, AdType::Interstitial)
    }

    /// Parameters for a native placement.
    pub fn native(
        config_id: impl Into<String>,
        assets: impl IntoIterator<Item = (NativeAssetKind, NativeAssetParams)>,
        version: NativeRequestVersion,
    ) -> Result<Self, ParamsError> {
        let mut params = Self::new(config_id, AdType::Native)?;
        params.native_assets = assets.into_iter().collect();
        params.native_version = version;
        Ok(params)
    }

    fn new(config_id: impl Into<String>, ad_type: AdType) -> Result<Self, ParamsError> {
        let config_id = config_id.into();
        if config_id.trim().is_empty() {
            return Err(ParamsError::EmptyConfigId);
        }
        Ok(Self {
            config_id,
            ad_type,
            sizes: BTreeSet::new(),
            keywords: Vec::new(),
            native_assets: BTreeMap::new(),
            native_version: NativeRequestVersion::default(),
        })
    }

    /// Attach user keywords, preserving their order.
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn ad_type(&self) -> AdType {
        self.ad_type
    }

    /// Requested sizes. Always empty for interstitials.
    pub fn sizes(&self) -> impl Iterator<Item = &AdSize> {
        self.sizes.iter().filter(|_| self.ad_type != AdType::Interstitial)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn native_assets(&self) -> &BTreeMap<NativeAssetKind, NativeAssetParams> {
        &self.native_assets
    }

    pub fn native_version(&self) -> NativeRequestVersion {
        self.native_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_validation() {
        assert!(AdSize::new(300, 250).is_ok());
        assert_eq!(
            AdSize::new(0, 250),
            Err(ParamsError::InvalidSize { width: 0, height: 250 })
        );
    }

    #[test]
    fn test_size_parsing() {
        let size: AdSize = "320x50".parse().unwrap();
        assert_eq!((size.width(), size.height()), (320, 50));
        assert_eq!(size.to_string(), "320x50");

        assert!(matches!("320".parse::<AdSize>(), Err(ParamsError::UnparsableSize(_))));
        assert!(matches!("0x50".parse::<AdSize>(), Err(ParamsError::InvalidSize { .. })));
    }

    #[test]
    fn test_empty_config_id_rejected() {
        assert_eq!(RequestParams::interstitial("  "), Err(ParamsError::EmptyConfigId));
    }

    #[test]
    fn test_banner_sizes_are_deduplicated_and_ordered() {
        let sizes = [
            AdSize::new(728, 90).unwrap(),
            AdSize::new(300, 250).unwrap(),
            AdSize::new(728, 90).unwrap(),
        ];
        let params = RequestParams::banner("cfg", sizes).unwrap();
        let got: Vec<String> = params.sizes().map(|s| s.to_string()).collect();
        assert_eq!(got, vec!["300x250", "728x90"]);
    }

    #[test]
    fn test_keywords_keep_order() {
        let params = RequestParams::interstitial("cfg")
            .unwrap()
            .with_keywords(["sports", "news", "autos"]);
        assert_eq!(params.keywords(), ["sports", "news", "autos"]);
        assert_eq!(params.sizes().count(), 0);
    }

    #[test]
    fn test_native_asset_classes() {
        assert_eq!(NativeAssetKind::Title.class(), NativeAssetClass::Title);
        assert_eq!(NativeAssetKind::MainImage.class(), NativeAssetClass::Image(3));
        assert_eq!(NativeAssetKind::CtaText.class(), NativeAssetClass::Data(12));
    }
}
