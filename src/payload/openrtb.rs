//! Bid request wire types.
//!
//! Only the subset of OpenRTB 2.5 the auction server reads is modelled.
//! Empty optional fields are skipped so the body stays minimal.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BidRequest {
    pub id: String,
    pub source: Source,
    pub tmax: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imp: Vec<Imp>,
    pub device: Device,
    pub app: App,
    pub user: User,
    #[serde(skip_serializing_if = "Regs::is_empty")]
    pub regs: Regs,
    pub ext: RequestExt,
}

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub tid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Imp {
    pub id: String,
    pub secure: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instl: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<Native>,
    pub ext: ImpExt,
}

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub format: Vec<Format>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Format {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Native {
    /// JSON-encoded native request, sent as a string.
    pub request: String,
    pub ver: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeRequest {
    pub assets: Vec<NativeAsset>,
    pub context: u8,
    pub contextsubtype: u8,
    pub plcmttype: u8,
    pub ver: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NativeAsset {
    pub required: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<NativeTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<NativeImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NativeData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeTitle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NativeImage {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wmin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mimes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeData {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpExt {
    pub prebid: StoredRequestExt,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredRequestExt {
    pub storedrequest: StoredRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ua: Option<String>,
    pub lmt: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifa: Option<String>,
    pub os: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pxratio: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mccmnc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    pub connectiontype: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
    pub lastfix: u64,
    pub accuracy: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct App {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storeurl: Option<String>,
    pub publisher: Publisher,
    pub ext: AppExt,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Publisher {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppExt {
    pub prebid: AppPrebid,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppPrebid {
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yob: Option<u32>,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<UserExt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserExt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Regs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coppa: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<RegsExt>,
}

impl Regs {
    pub fn is_empty(&self) -> bool {
        self.coppa.is_none() && self.ext.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegsExt {
    pub gdpr: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestExt {
    pub prebid: RequestPrebid,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestPrebid {
    pub cache: Cache,
    pub storedrequest: StoredRequest,
    /// Always sent empty; asks the server to return targeting keywords.
    pub targeting: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Cache {
    pub bids: BTreeMap<String, String>,
}
