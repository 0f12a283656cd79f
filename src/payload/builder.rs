//! Bid request construction.
//!
//! Pure mapping from request parameters, an environment snapshot and the
//! server settings to a serialized bid request. No I/O and no shared state:
//! the armed timeout is passed in by the connector.

use thiserror::Error;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::payload::environment::{DeviceInfo, Environment};
use crate::payload::openrtb::*;
use crate::request::{AdType, NativeAssetClass, RequestParams};

/// Impression id the auction server expects from mobile clients.
pub const IMP_ID: &str = "PrebidMobile";

/// Source name reported in `app.ext.prebid.source`.
pub const SOURCE_NAME: &str = "prebid-mobile";

/// Errors raised while building a bid request.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Interstitial sizing needs the display size, which is unknown.
    #[error("display context unavailable, cannot size interstitial")]
    MissingDisplayContext,

    /// The request could not be serialized.
    #[error("failed to encode bid request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Build the bid request for one auction.
pub fn build_bid_request(
    params: &RequestParams,
    env: &Environment,
    server: &ServerConfig,
    tmax_ms: u64,
) -> Result<BidRequest, PayloadError> {
    let id = Uuid::new_v4().to_string();

    Ok(BidRequest {
        source: Source { tid: id.clone() },
        id,
        tmax: tmax_ms,
        imp: vec![build_imp(params, env)?],
        device: build_device(&env.device, server.share_geo_location),
        app: build_app(env, server),
        user: build_user(params, env),
        regs: build_regs(env),
        ext: RequestExt {
            prebid: RequestPrebid {
                cache: Cache::default(),
                storedrequest: StoredRequest {
                    id: server.account_id.clone(),
                },
                targeting: Default::default(),
            },
        },
    })
}

/// Build and serialize the bid request.
pub fn encode_bid_request(
    params: &RequestParams,
    env: &Environment,
    server: &ServerConfig,
    tmax_ms: u64,
) -> Result<Vec<u8>, PayloadError> {
    let request = build_bid_request(params, env, server, tmax_ms)?;
    Ok(serde_json::to_vec(&request)?)
}

fn build_imp(params: &RequestParams, env: &Environment) -> Result<Imp, PayloadError> {
    let mut imp = Imp {
        id: IMP_ID.to_string(),
        secure: 1,
        instl: None,
        banner: None,
        native: None,
        ext: ImpExt {
            prebid: StoredRequestExt {
                storedrequest: StoredRequest {
                    id: params.config_id().to_string(),
                },
            },
        },
    };

    match params.ad_type() {
        AdType::Interstitial => {
            let display = env
                .device
                .display
                .ok_or(PayloadError::MissingDisplayContext)?;
            imp.instl = Some(1);
            imp.banner = Some(Banner {
                format: vec![Format {
                    w: display.width,
                    h: display.height,
                }],
            });
        }
        AdType::Banner => {
            imp.banner = Some(Banner {
                format: params
                    .sizes()
                    .map(|s| Format {
                        w: s.width(),
                        h: s.height(),
                    })
                    .collect(),
            });
        }
        AdType::Native => {
            imp.native = Some(build_native(params)?);
        }
    }

    Ok(imp)
}

fn build_native(params: &RequestParams) -> Result<Native, PayloadError> {
    let assets = params
        .native_assets()
        .iter()
        .map(|(kind, p)| {
            let mut asset = NativeAsset {
                required: p.required as u8,
                ..NativeAsset::default()
            };
            match kind.class() {
                NativeAssetClass::Title => asset.title = Some(NativeTitle { len: p.len }),
                NativeAssetClass::Data(kind) => asset.data = Some(NativeData { kind, len: p.len }),
                NativeAssetClass::Image(kind) => {
                    let mut img = NativeImage {
                        kind,
                        mimes: p.mimes.clone(),
                        ..NativeImage::default()
                    };
                    if p.wmin > 0 && p.hmin > 0 {
                        img.wmin = Some(p.wmin);
                        img.hmin = Some(p.hmin);
                    }
                    if p.w > 0 && p.h > 0 {
                        img.w = Some(p.w);
                        img.h = Some(p.h);
                    }
                    asset.img = Some(img);
                }
            }
            asset
        })
        .collect();

    let ver = params.native_version().as_str().to_string();
    let request = NativeRequest {
        assets,
        context: 2,
        contextsubtype: 20,
        plcmttype: 1,
        ver: ver.clone(),
    };

    Ok(Native {
        request: serde_json::to_string(&request)?,
        ver,
    })
}

fn build_device(device: &DeviceInfo, share_geo: bool) -> Device {
    let mut out = Device {
        make: non_empty(&device.make),
        model: non_empty(&device.model),
        ua: non_empty(&device.user_agent),
        lmt: device.limit_ad_tracking as u8,
        os: device.os.clone(),
        osv: non_empty(&device.os_version),
        language: non_empty(&device.language),
        carrier: non_empty(&device.carrier),
        connectiontype: device.connection.code(),
        ..Device::default()
    };

    if !device.limit_ad_tracking {
        out.ifa = non_empty(&device.advertising_id);
    }

    if let Some(display) = device.display {
        out.w = Some(display.width);
        out.h = Some(display.height);
        out.pxratio = Some(display.pixel_ratio);
    }

    if device.mcc > 0 && device.mnc > 0 {
        out.mccmnc = Some(format!("{}-{}", device.mcc, device.mnc));
    }

    if share_geo {
        out.geo = device.geo.map(|g| Geo {
            lat: g.lat,
            lon: g.lon,
            lastfix: g.age_ms,
            accuracy: g.accuracy,
        });
    }

    out
}

fn build_app(env: &Environment, server: &ServerConfig) -> App {
    App {
        bundle: non_empty(&env.app.bundle),
        ver: non_empty(&env.app.version),
        name: non_empty(&env.app.name),
        domain: non_empty(&env.app.domain),
        storeurl: non_empty(&env.app.store_url),
        publisher: Publisher {
            id: server.account_id.clone(),
        },
        ext: AppExt {
            prebid: AppPrebid {
                source: SOURCE_NAME.to_string(),
                version: server.sdk_version.clone(),
            },
        },
    }
}

fn build_user(params: &RequestParams, env: &Environment) -> User {
    let keywords = params.keywords().join(",");
    User {
        yob: (env.user.year_of_birth > 0).then_some(env.user.year_of_birth),
        gender: env.user.gender.code().to_string(),
        keywords: (!keywords.is_empty()).then_some(keywords),
        ext: env.regs.subject_to_gdpr.map(|_| UserExt {
            consent: env.regs.gdpr_consent.clone(),
        }),
    }
}

fn build_regs(env: &Environment) -> Regs {
    Regs {
        coppa: env.regs.subject_to_coppa.then_some(1),
        ext: (env.regs.subject_to_gdpr == Some(true)).then_some(RegsExt { gdpr: 1 }),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
