//! Layer stack scripts.
//!
//! A script is a JSON list of layer creation statements, one per layer above
//! the base image. Replaying the statements in order on a fresh stack
//! rebuilds it. Binary per-layer data (curve tables, 3D lattices, masks) is
//! base64 encoded inside the statements.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{Mask, PixelBuffer, Rect};
use crate::layers::{
    BlendMode, FilterParams, Layer, LayerOp, LayerStack, Lut3DParams, SegmentationParams,
    TemperatureParams,
};
use crate::lut1d::{ChannelCurves, ColorModel, LUT_SIZE, Lut1D};
use crate::lut3d::{MAX_SIZE, MIN_SIZE};

/// Current script format version.
pub const SCRIPT_VERSION: u32 = 1;

/// Conventional file extension of stack scripts.
pub const SCRIPT_EXTENSION: &str = "sba";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackScript {
    pub version: u32,
    pub layers: Vec<LayerStatement>,
}

/// Creation statement for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStatement {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<EncodedMask>,
    pub op: OpStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedMask {
    pub width: u32,
    pub height: u32,
    /// Base64 mask bytes, one per pixel.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpStatement {
    Curve1d {
        model: ColorModel,
        /// Base64 256-byte tables, `null` for untouched channels.
        curves: [Option<String>; 3],
    },
    Lut3d {
        size: usize,
        /// Base64 little-endian `f32` RGB triples, R fastest.
        data: String,
    },
    Temperature(TemperatureParams),
    Filter(FilterParams),
    Segmentation(SegmentationParams),
}

impl StackScript {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let script: Self = serde_json::from_str(json)
            .map_err(|e| Error::format(format!("malformed stack script: {e}")))?;
        if script.version != SCRIPT_VERSION {
            return Err(Error::format(format!(
                "unsupported stack script version {} (expected {SCRIPT_VERSION})",
                script.version
            )));
        }
        Ok(script)
    }
}

impl LayerStack {
    /// Describes every layer above the base as a creation statement.
    pub fn to_script(&self) -> StackScript {
        StackScript {
            version: SCRIPT_VERSION,
            layers: self
                .layers()
                .iter()
                .skip(1)
                .filter_map(encode_layer)
                .collect(),
        }
    }

    /// Rebuilds a stack over `base` by replaying `script`.
    pub fn from_script(base: PixelBuffer, script: &StackScript) -> Result<Self> {
        if script.version != SCRIPT_VERSION {
            return Err(Error::format(format!(
                "unsupported stack script version {}",
                script.version
            )));
        }
        let mut stack = LayerStack::new(base);
        for (i, statement) in script.layers.iter().enumerate() {
            let layer = decode_layer(statement)
                .map_err(|e| Error::format(format!("statement {i} ('{}'): {e}", statement.name)))?;
            stack.push(layer)?;
        }
        stack.set_active(0)?;
        Ok(stack)
    }

    pub fn save_script(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_script().to_json()?)?;
        tracing::info!(
            "Saved {} layer statement(s) to {}",
            self.len() - 1,
            path.display()
        );
        Ok(())
    }

    pub fn load_script(base: PixelBuffer, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let script = StackScript::from_json(&std::fs::read_to_string(path)?)?;
        let stack = Self::from_script(base, &script)?;
        tracing::info!("Loaded {} layer(s) from {}", script.layers.len(), path.display());
        Ok(stack)
    }
}

fn encode_layer(layer: &Layer) -> Option<LayerStatement> {
    let op = match layer.op() {
        LayerOp::Source => return None,
        LayerOp::Curve1D(curves) => OpStatement::Curve1d {
            model: curves.model,
            curves: curves
                .curves
                .each_ref()
                .map(|c| c.as_ref().map(|lut| BASE64.encode(lut.as_slice()))),
        },
        LayerOp::Lut3D(params) => OpStatement::Lut3d {
            size: params.size,
            data: BASE64.encode(
                params
                    .data
                    .iter()
                    .flat_map(|rgb| rgb.iter().flat_map(|c| c.to_le_bytes()))
                    .collect::<Vec<u8>>(),
            ),
        },
        LayerOp::Temperature(params) => OpStatement::Temperature(*params),
        LayerOp::Filter(params) => OpStatement::Filter(*params),
        LayerOp::Segmentation(params) => OpStatement::Segmentation(*params),
    };
    Some(LayerStatement {
        name: layer.name.clone(),
        visible: layer.is_visible(),
        opacity: layer.opacity(),
        blend_mode: layer.blend_mode(),
        rect: layer.rect(),
        mask: layer.mask().map(|m| EncodedMask {
            width: m.width,
            height: m.height,
            data: BASE64.encode(&m.data),
        }),
        op,
    })
}

fn decode_layer(statement: &LayerStatement) -> Result<Layer> {
    let op = match &statement.op {
        OpStatement::Curve1d { model, curves } => {
            let mut decoded = ChannelCurves::new(*model);
            for (slot, encoded) in decoded.curves.iter_mut().zip(curves) {
                if let Some(encoded) = encoded {
                    let table = decode_base64(encoded)?;
                    if table.len() != LUT_SIZE {
                        return Err(Error::format(format!(
                            "curve table has {} entries",
                            table.len()
                        )));
                    }
                    *slot = Some(Lut1D::from_table(&table)?);
                }
            }
            LayerOp::Curve1D(decoded)
        }
        OpStatement::Lut3d { size, data } => {
            if !(MIN_SIZE..=MAX_SIZE).contains(size) {
                return Err(Error::format(format!(
                    "3D LUT size {size} outside [{MIN_SIZE}, {MAX_SIZE}]"
                )));
            }
            let bytes = decode_base64(data)?;
            let expected = size.pow(3) * 12;
            if bytes.len() != expected {
                return Err(Error::format(format!(
                    "3D LUT of size {size} needs {expected} bytes, got {}",
                    bytes.len()
                )));
            }
            let data = bytes
                .chunks_exact(12)
                .map(|node| {
                    let c = |i: usize| {
                        f32::from_le_bytes([node[i], node[i + 1], node[i + 2], node[i + 3]])
                    };
                    [c(0), c(4), c(8)]
                })
                .collect();
            LayerOp::Lut3D(Lut3DParams { size: *size, data })
        }
        OpStatement::Temperature(params) => LayerOp::Temperature(*params),
        OpStatement::Filter(params) => LayerOp::Filter(*params),
        OpStatement::Segmentation(params) => LayerOp::Segmentation(*params),
    };

    let mut layer = Layer::new(statement.name.clone(), op)
        .with_visible(statement.visible)
        .with_opacity(statement.opacity)
        .with_blend_mode(statement.blend_mode);
    if let Some(rect) = statement.rect {
        layer = layer.with_rect(rect);
    }
    if let Some(mask) = &statement.mask {
        let data = decode_base64(&mask.data)?;
        layer = layer.with_mask(Mask::from_data(mask.width, mask.height, data)?);
    }
    Ok(layer)
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data)
        .map_err(|e| Error::format(format!("invalid base64 data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{FilterKind, TemperatureMethod};
    use crate::lut1d::build_lut_from_control_points;
    use crate::lut3d::Lut3D;

    fn base() -> PixelBuffer {
        let mut buf = PixelBuffer::new(6, 6);
        for (i, px) in buf.pixels.iter_mut().enumerate() {
            *px = [(i * 7) as u8, (i * 3) as u8, 200, 255];
        }
        buf
    }

    fn sample_stack() -> LayerStack {
        let mut stack = LayerStack::new(base());
        let curve = build_lut_from_control_points(&[[0.0, 10.0], [128.0, 160.0], [255.0, 250.0]])
            .expect("valid points");
        stack
            .push(
                Layer::new("curve", LayerOp::Curve1D(ChannelCurves::new(ColorModel::Hsb).with_channel(2, curve)))
                    .with_opacity(0.75)
                    .with_blend_mode(BlendMode::Screen),
            )
            .expect("valid");
        let mut lut = Lut3D::identity(3).expect("valid size");
        lut.set(1, 1, 1, [0.1, 0.2, 0.3]).expect("in bounds");
        stack
            .push(
                Layer::new("lut", LayerOp::Lut3D(Lut3DParams::from(&lut)))
                    .with_mask(Mask::from_rect(6, 6, Rect::new(1, 1, 3, 3))),
            )
            .expect("valid");
        stack
            .push(
                Layer::new(
                    "warm",
                    LayerOp::Temperature(TemperatureParams {
                        kelvin: 4200.0,
                        method: TemperatureMethod::ChromaticAdaptation,
                    }),
                )
                .with_visible(false)
                .with_rect(Rect::new(0, 0, 3, 6)),
            )
            .expect("valid");
        stack
            .push(Layer::new(
                "sharpen",
                LayerOp::Filter(FilterParams {
                    kind: FilterKind::Sharpen,
                    radius: 1,
                    amount: 0.5,
                }),
            ))
            .expect("valid");
        stack
    }

    #[test]
    fn test_script_replay_rebuilds_the_stack() {
        let mut original = sample_stack();
        let json = original.to_script().to_json().expect("serializes");
        let script = StackScript::from_json(&json).expect("parses");
        assert_eq!(script.layers.len(), 4);

        let mut replayed = LayerStack::from_script(base(), &script).expect("replays");
        assert_eq!(replayed.len(), original.len());
        for (a, b) in original.layers().iter().zip(replayed.layers()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.op(), b.op());
            assert_eq!(a.opacity(), b.opacity());
            assert_eq!(a.blend_mode(), b.blend_mode());
            assert_eq!(a.is_visible(), b.is_visible());
            assert_eq!(a.rect(), b.rect());
            assert_eq!(a.mask(), b.mask());
        }
        assert_eq!(
            original.render().expect("renders"),
            replayed.render().expect("renders")
        );
    }

    #[test]
    fn test_statements_are_tagged() {
        let json = sample_stack().to_script().to_json().expect("serializes");
        assert!(json.contains(r#""op": "curve1d""#));
        assert!(json.contains(r#""op": "lut3d""#));
        assert!(json.contains(r#""op": "filter""#));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(format!("stack.{SCRIPT_EXTENSION}"));
        let stack = sample_stack();
        stack.save_script(&path).expect("saves");
        let loaded = LayerStack::load_script(base(), &path).expect("loads");
        assert_eq!(loaded.len(), stack.len());
    }

    #[test]
    fn test_malformed_scripts_are_format_errors() {
        assert!(matches!(StackScript::from_json("[1, 2"), Err(Error::Format(_))));
        assert!(matches!(
            StackScript::from_json(r#"{"version": 99, "layers": []}"#),
            Err(Error::Format(_))
        ));

        let mut script = sample_stack().to_script();
        if let OpStatement::Lut3d { data, .. } = &mut script.layers[1].op {
            data.truncate(8);
        }
        assert!(matches!(
            LayerStack::from_script(base(), &script),
            Err(Error::Format(_))
        ));

        let mut script = sample_stack().to_script();
        if let OpStatement::Curve1d { curves, .. } = &mut script.layers[0].op {
            curves[2] = Some("not base64!".to_string());
        }
        assert!(matches!(
            LayerStack::from_script(base(), &script),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_oversized_lut_grid_is_format_error() {
        let json = r#"{"version": 1, "layers": [{"name": "lut", "visible": true,
            "opacity": 1.0, "blend_mode": "normal",
            "op": {"op": "lut3d", "size": 4000000, "data": ""}}]}"#;
        let script = StackScript::from_json(json).expect("parses");
        let err = LayerStack::from_script(base(), &script).expect_err("size out of range");
        assert!(matches!(err, Error::Format(_)), "got {err:?}");

        let mut script = sample_stack().to_script();
        if let OpStatement::Lut3d { size, .. } = &mut script.layers[1].op {
            *size = 1;
        }
        assert!(matches!(
            LayerStack::from_script(base(), &script),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_rect_at_coordinate_limit_renders() {
        let mut script = sample_stack().to_script();
        script.layers[0].rect = Some(Rect::new(u32::MAX, 0, 10, 10));
        let mut stack = LayerStack::from_script(base(), &script).expect("replays");
        let mut without = sample_stack();
        without.remove(1).expect("layer exists");
        let rendered = stack.render().expect("renders");
        assert_eq!(rendered, without.render().expect("renders"), "off-image rect hides the layer");
    }
}
