//! The `warpconfig` document schema
//!
//! Canonical serialization for a [`WarpSet`]: a tree-structured XML document
//! with one `<map>` per warp under a single profile. Reading is forgiving,
//! so a host can always recover by installing its own default warp: a
//! document without a `warpconfig` root or with malformed content yields an
//! empty set, unknown warp methods are skipped, and missing attributes fall
//! back to their documented defaults.

use glam::Vec2;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::se::to_string;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::blend::{BlendEdges, EdgeBlend, Rgb};
use crate::warp::{BilinearWarp, PerspectiveBilinearWarp, PerspectiveWarp, Warp, WarpSet};

/// Errors from the file-level helpers. Parsing failures never surface here;
/// they degrade to an empty warp set.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
}

impl WarpSet {
    /// Parse a `warpconfig` document. Anything unusable (wrong root
    /// element, malformed XML, no profile) yields an empty set.
    pub fn from_xml_str(xml: &str) -> WarpSet {
        if !has_warpconfig_root(xml) {
            return WarpSet::new();
        }

        let doc: WarpConfigXml = match from_str(xml) {
            Ok(doc) => doc,
            Err(err) => {
                log::warn!("malformed warp configuration: {}", err);
                return WarpSet::new();
            }
        };

        let mut set = WarpSet::new();
        let Some(profile) = doc.profiles.first() else {
            return set;
        };

        for map in &profile.maps {
            let Some(warp) = &map.warp else { continue };
            match warp.method.as_str() {
                "bilinear" => set.push(Warp::Bilinear(bilinear_from_xml(warp))),
                "perspective" => set.push(Warp::Perspective(perspective_from_xml(warp))),
                "perspectivebilinear" => {
                    set.push(Warp::PerspectiveBilinear(perspective_bilinear_from_xml(warp)))
                }
                other => log::debug!("skipping warp with unknown method '{}'", other),
            }
        }

        log::debug!("loaded {} warps", set.len());
        set
    }

    /// Serialize to a `warpconfig` document with a single "default" profile
    /// and 1-based map ids in iteration order.
    pub fn to_xml_string(&self) -> Result<String, ConfigError> {
        let doc = WarpConfigXml {
            version: "1.0".to_string(),
            profile: "default".to_string(),
            profiles: vec![ProfileXml {
                name: "default".to_string(),
                maps: self
                    .warps()
                    .iter()
                    .enumerate()
                    .map(|(i, warp)| MapXml {
                        id: i + 1,
                        display: 1,
                        warp: Some(warp_to_xml(warp)),
                    })
                    .collect(),
            }],
        };

        let xml = to_string(&doc)?;
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}",
            xml
        ))
    }

    /// Read a settings file; a missing or malformed document is an IO error
    /// or an empty set respectively.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<WarpSet, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_xml_str(&contents))
    }

    /// Write a settings file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }
}

/// The document must actually be rooted at `<warpconfig>`; any other root
/// element means "not a warp settings file", not an error.
fn has_warpconfig_root(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return e.name().as_ref() == b"warpconfig"
            }
            Ok(Event::Eof) | Err(_) => return false,
            Ok(_) => continue,
        }
    }
}

// ── document structure ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "warpconfig")]
struct WarpConfigXml {
    #[serde(rename = "@version", default = "default_version")]
    version: String,
    #[serde(rename = "@profile", default = "default_profile")]
    profile: String,
    #[serde(rename = "profile", default)]
    profiles: Vec<ProfileXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileXml {
    #[serde(rename = "@name", default = "default_profile")]
    name: String,
    #[serde(rename = "map", default)]
    maps: Vec<MapXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapXml {
    #[serde(rename = "@id", default)]
    id: usize,
    #[serde(rename = "@display", default = "default_display")]
    display: u32,
    #[serde(rename = "warp", default)]
    warp: Option<WarpXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WarpXml {
    #[serde(rename = "@method", default)]
    method: String,
    #[serde(rename = "@width", default = "default_grid_dim")]
    width: usize,
    #[serde(rename = "@height", default = "default_grid_dim")]
    height: usize,
    #[serde(rename = "@brightness", default = "default_brightness")]
    brightness: f32,
    // bilinear-only attributes
    #[serde(rename = "@resolution", default, skip_serializing_if = "Option::is_none")]
    resolution: Option<u32>,
    #[serde(rename = "@linear", default, skip_serializing_if = "Option::is_none")]
    linear: Option<bool>,
    #[serde(rename = "@adaptive", default, skip_serializing_if = "Option::is_none")]
    adaptive: Option<bool>,
    #[serde(rename = "controlpoint", default)]
    control_points: Vec<PointXml>,
    // perspectivebilinear-only elements
    #[serde(rename = "corner", default, skip_serializing_if = "Vec::is_empty")]
    corners: Vec<PointXml>,
    #[serde(rename = "blend", default, skip_serializing_if = "Option::is_none")]
    blend: Option<BlendXml>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PointXml {
    #[serde(rename = "@x", default)]
    x: f32,
    #[serde(rename = "@y", default)]
    y: f32,
}

impl From<Vec2> for PointXml {
    fn from(p: Vec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct BlendXml {
    #[serde(rename = "@exponent")]
    exponent: Exponent,
    edges: EdgesXml,
    gamma: GammaXml,
    luminance: LuminanceXml,
}

// Newtype so a missing exponent attribute defaults to 2.0.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
struct Exponent(f32);

impl Default for Exponent {
    fn default() -> Self {
        Self(2.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgesXml {
    #[serde(rename = "@left", default = "zero")]
    left: f32,
    #[serde(rename = "@top", default = "zero")]
    top: f32,
    #[serde(rename = "@right", default = "one")]
    right: f32,
    #[serde(rename = "@bottom", default = "one")]
    bottom: f32,
}

impl Default for EdgesXml {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GammaXml {
    #[serde(rename = "@red", default = "one")]
    red: f32,
    #[serde(rename = "@green", default = "one")]
    green: f32,
    #[serde(rename = "@blue", default = "one")]
    blue: f32,
}

impl Default for GammaXml {
    fn default() -> Self {
        Self {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LuminanceXml {
    #[serde(rename = "@red", default = "half")]
    red: f32,
    #[serde(rename = "@green", default = "half")]
    green: f32,
    #[serde(rename = "@blue", default = "half")]
    blue: f32,
}

impl Default for LuminanceXml {
    fn default() -> Self {
        Self {
            red: 0.5,
            green: 0.5,
            blue: 0.5,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_display() -> u32 {
    1
}

fn default_grid_dim() -> usize {
    2
}

fn default_brightness() -> f32 {
    1.0
}

fn zero() -> f32 {
    0.0
}

fn one() -> f32 {
    1.0
}

fn half() -> f32 {
    0.5
}

// ── conversions ─────────────────────────────────────────────────────────

fn xml_points(points: &[PointXml]) -> Vec<Vec2> {
    points.iter().map(|p| Vec2::new(p.x, p.y)).collect()
}

fn apply_mesh_attributes(warp: &mut BilinearWarp, xml: &WarpXml) {
    warp.apply_grid(xml.width, xml.height, xml_points(&xml.control_points));
    warp.set_brightness(xml.brightness);
    warp.set_resolution(xml.resolution.unwrap_or(16));
    warp.set_linear(xml.linear.unwrap_or(false));
    warp.set_adaptive(xml.adaptive.unwrap_or(false));
}

fn bilinear_from_xml(xml: &WarpXml) -> BilinearWarp {
    let mut warp = BilinearWarp::new();
    apply_mesh_attributes(&mut warp, xml);
    warp
}

fn perspective_from_xml(xml: &WarpXml) -> PerspectiveWarp {
    let mut warp = PerspectiveWarp::new();
    warp.set_brightness(xml.brightness);
    let points = xml_points(&xml.control_points);
    if points.len() == 4 {
        for (i, p) in points.into_iter().enumerate() {
            warp.field_mut().set(i, p);
        }
    } else if !points.is_empty() {
        log::warn!(
            "perspective warp expects 4 control points, got {}; using defaults",
            points.len()
        );
    }
    warp
}

fn perspective_bilinear_from_xml(xml: &WarpXml) -> PerspectiveBilinearWarp {
    let mut warp = PerspectiveBilinearWarp::new();
    apply_mesh_attributes(warp.mesh_mut(), xml);

    if xml.corners.len() == 4 {
        for (i, corner) in xml.corners.iter().enumerate() {
            warp.perspective_mut()
                .field_mut()
                .set(i, Vec2::new(corner.x, corner.y));
        }
    } else if !xml.corners.is_empty() {
        log::warn!(
            "composite warp expects 4 corners, got {}; using defaults",
            xml.corners.len()
        );
    }

    if let Some(blend) = &xml.blend {
        warp.set_blend(blend_from_xml(blend));
    }
    warp
}

fn blend_from_xml(xml: &BlendXml) -> EdgeBlend {
    EdgeBlend {
        exponent: xml.exponent.0,
        edges: BlendEdges {
            left: xml.edges.left,
            top: xml.edges.top,
            right: xml.edges.right,
            bottom: xml.edges.bottom,
        },
        gamma: Rgb {
            red: xml.gamma.red,
            green: xml.gamma.green,
            blue: xml.gamma.blue,
        },
        luminance: Rgb {
            red: xml.luminance.red,
            green: xml.luminance.green,
            blue: xml.luminance.blue,
        },
    }
}

fn blend_to_xml(blend: &EdgeBlend) -> BlendXml {
    BlendXml {
        exponent: Exponent(blend.exponent),
        edges: EdgesXml {
            left: blend.edges.left,
            top: blend.edges.top,
            right: blend.edges.right,
            bottom: blend.edges.bottom,
        },
        gamma: GammaXml {
            red: blend.gamma.red,
            green: blend.gamma.green,
            blue: blend.gamma.blue,
        },
        luminance: LuminanceXml {
            red: blend.luminance.red,
            green: blend.luminance.green,
            blue: blend.luminance.blue,
        },
    }
}

fn warp_to_xml(warp: &Warp) -> WarpXml {
    match warp {
        Warp::Bilinear(w) => WarpXml {
            method: "bilinear".to_string(),
            width: w.field().columns(),
            height: w.field().rows(),
            brightness: w.brightness(),
            resolution: Some(w.resolution()),
            linear: Some(w.is_linear()),
            adaptive: Some(w.is_adaptive()),
            control_points: w.field().points().iter().map(|&p| p.into()).collect(),
            corners: Vec::new(),
            blend: None,
        },
        Warp::Perspective(w) => WarpXml {
            method: "perspective".to_string(),
            width: w.field().columns(),
            height: w.field().rows(),
            brightness: w.brightness(),
            resolution: None,
            linear: None,
            adaptive: None,
            control_points: w.field().points().iter().map(|&p| p.into()).collect(),
            corners: Vec::new(),
            blend: None,
        },
        Warp::PerspectiveBilinear(w) => WarpXml {
            method: "perspectivebilinear".to_string(),
            width: w.mesh().field().columns(),
            height: w.mesh().field().rows(),
            brightness: w.brightness(),
            resolution: Some(w.mesh().resolution()),
            linear: Some(w.mesh().is_linear()),
            adaptive: Some(w.mesh().is_adaptive()),
            // mesh points are stored in the inner, pre-perspective space
            control_points: w.mesh().field().points().iter().map(|&p| p.into()).collect(),
            corners: w
                .perspective()
                .field()
                .points()
                .iter()
                .map(|&p| p.into())
                .collect(),
            blend: Some(blend_to_xml(w.blend())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn assert_points_close(a: &[Vec2], b: &[Vec2]) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert!(p.distance(*q) < 1e-5, "{:?} != {:?}", p, q);
        }
    }

    #[test]
    fn test_round_trip_preserves_warps() {
        init_logger();
        let mut set = WarpSet::new();

        let mut bilinear = BilinearWarp::with_grid(3, 3);
        bilinear.set_linear(true);
        bilinear.set_resolution(20);
        bilinear.field_mut().set(4, Vec2::new(0.45, 0.55));
        bilinear.set_brightness(0.8);
        set.push(bilinear);

        let mut perspective = PerspectiveWarp::new();
        perspective.field_mut().set(1, Vec2::new(0.9, 0.05));
        set.push(perspective);

        let mut composite = PerspectiveBilinearWarp::new();
        composite.mesh_mut().set_columns(4);
        composite.perspective_mut().field_mut().set(2, Vec2::new(0.92, 0.88));
        composite.blend_mut().set_edges(0.1, 0.0, 0.85, 1.0);
        composite.blend_mut().set_exponent(1.8);
        set.push(composite);

        let xml = set.to_xml_string().unwrap();
        let loaded = WarpSet::from_xml_str(&xml);

        assert_eq!(loaded.len(), 3);
        for (original, copy) in set.iter().zip(loaded.iter()) {
            assert_eq!(original.kind(), copy.kind());
        }

        let (Warp::Bilinear(a), Warp::Bilinear(b)) = (set.get(0).unwrap(), loaded.get(0).unwrap())
        else {
            panic!("expected bilinear warps");
        };
        assert_points_close(a.field().points(), b.field().points());
        assert_eq!(a.resolution(), b.resolution());
        assert_eq!(a.is_linear(), b.is_linear());
        assert!((a.brightness() - b.brightness()).abs() < 1e-6);

        let (Warp::Perspective(a), Warp::Perspective(b)) =
            (set.get(1).unwrap(), loaded.get(1).unwrap())
        else {
            panic!("expected perspective warps");
        };
        assert_points_close(a.field().points(), b.field().points());

        let (Warp::PerspectiveBilinear(a), Warp::PerspectiveBilinear(b)) =
            (set.get(2).unwrap(), loaded.get(2).unwrap())
        else {
            panic!("expected composite warps");
        };
        assert_points_close(a.mesh().field().points(), b.mesh().field().points());
        assert_points_close(
            a.perspective().field().points(),
            b.perspective().field().points(),
        );
        assert_eq!(a.blend(), b.blend());
    }

    #[test]
    fn test_missing_root_yields_empty_set() {
        assert!(WarpSet::from_xml_str("<notawarp/>").is_empty());
        assert!(WarpSet::from_xml_str("").is_empty());
        assert!(WarpSet::from_xml_str("not xml at all").is_empty());
    }

    #[test]
    fn test_unknown_method_skipped() {
        let xml = r#"<?xml version="1.0"?>
            <warpconfig version="1.0" profile="default">
              <profile name="default">
                <map id="1" display="1">
                  <warp method="bilinear" width="2" height="2"/>
                </map>
                <map id="2" display="1">
                  <warp method="nosuchwarp" width="2" height="2"/>
                </map>
              </profile>
            </warpconfig>"#;
        let set = WarpSet::from_xml_str(xml);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().kind().method(), "bilinear");
    }

    #[test]
    fn test_attribute_defaults() {
        let xml = r#"<warpconfig>
              <profile>
                <map>
                  <warp method="bilinear"/>
                </map>
              </profile>
            </warpconfig>"#;
        let set = WarpSet::from_xml_str(xml);
        assert_eq!(set.len(), 1);
        let Warp::Bilinear(warp) = set.get(0).unwrap() else {
            panic!("expected a bilinear warp");
        };
        assert_eq!(warp.field().columns(), 2);
        assert_eq!(warp.field().rows(), 2);
        assert_eq!(warp.resolution(), 16);
        assert!(!warp.is_linear());
        assert!(!warp.is_adaptive());
        assert!((warp.brightness() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blend_defaults() {
        let xml = r#"<warpconfig>
              <profile>
                <map>
                  <warp method="perspectivebilinear" width="2" height="2">
                    <controlpoint x="0" y="0"/>
                    <controlpoint x="0" y="1"/>
                    <controlpoint x="1" y="0"/>
                    <controlpoint x="1" y="1"/>
                    <corner x="0" y="0"/>
                    <corner x="1" y="0"/>
                    <corner x="1" y="1"/>
                    <corner x="0" y="1"/>
                    <blend exponent="1.5"/>
                  </warp>
                </map>
              </profile>
            </warpconfig>"#;
        let set = WarpSet::from_xml_str(xml);
        let Warp::PerspectiveBilinear(warp) = set.get(0).unwrap() else {
            panic!("expected a composite warp");
        };
        let blend = warp.blend();
        assert!((blend.exponent - 1.5).abs() < 1e-6);
        assert_eq!(blend.edges, BlendEdges::default());
        assert_eq!(blend.gamma, Rgb::splat(1.0));
        assert_eq!(blend.luminance, Rgb::splat(0.5));
    }

    #[test]
    fn test_mismatched_point_count_resets_grid() {
        init_logger();
        let xml = r#"<warpconfig>
              <profile>
                <map>
                  <warp method="bilinear" width="3" height="3">
                    <controlpoint x="0.5" y="0.5"/>
                  </warp>
                </map>
              </profile>
            </warpconfig>"#;
        let set = WarpSet::from_xml_str(xml);
        let Warp::Bilinear(warp) = set.get(0).unwrap() else {
            panic!("expected a bilinear warp");
        };
        // falls back to the undistorted 3x3 grid
        assert_eq!(warp.field().len(), 9);
        assert_eq!(warp.field().get(0), Vec2::ZERO);
    }

    #[test]
    fn test_map_ids_are_one_based() {
        let mut set = WarpSet::new();
        set.push(BilinearWarp::new());
        set.push(PerspectiveWarp::new());
        let xml = set.to_xml_string().unwrap();
        assert!(xml.contains(r#"<map id="1""#));
        assert!(xml.contains(r#"<map id="2""#));
        assert!(xml.contains(r#"profile="default""#));
    }

    #[test]
    fn test_empty_profile_loads_empty_set() {
        let xml = r#"<warpconfig version="1.0" profile="default">
              <profile name="default"/>
            </warpconfig>"#;
        assert!(WarpSet::from_xml_str(xml).is_empty());
    }
}
