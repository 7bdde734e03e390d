//! Quake II MD2 models.
//!
//! An MD2 file stores a triangle mesh once and its vertex positions once per
//! animation frame, quantised to bytes. [`Md2Model::parse`] validates the
//! whole file up front; [`Md2Model::mesh`] then builds a [`MeshData`] for any
//! point between two frames.

use std::{collections::HashMap, fmt};

use cgmath::{EuclideanSpace, Point3};

use crate::data_structures::{mesh::MeshData, vertex::ModelVertex};

pub const MD2_IDENT: [u8; 4] = *b"IDP2";
pub const MD2_VERSION: i32 = 8;

pub const MAX_SKINS: usize = 32;
pub const MAX_VERTICES: usize = 2048;
pub const MAX_TRIANGLES: usize = 4096;
pub const MAX_FRAMES: usize = 512;

const HEADER_SIZE: usize = 17 * 4;
const SKIN_NAME_SIZE: usize = 64;
const TEXCOORD_SIZE: usize = 4;
const TRIANGLE_SIZE: usize = 12;
const FRAME_NAME_SIZE: usize = 16;
const FRAME_HEADER_SIZE: usize = 6 * 4 + FRAME_NAME_SIZE;
const FRAME_VERTEX_SIZE: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Md2Error {
    Truncated { needed: usize, available: usize },
    BadIdent([u8; 4]),
    BadVersion(i32),
    NegativeCount { what: &'static str, count: i32 },
    LimitExceeded { what: &'static str, count: usize, limit: usize },
    SectionOutOfBounds { section: &'static str, offset: i32, size: usize, len: usize },
    InvalidFrameSize { expected: usize, found: i32 },
    IndexOutOfRange { what: &'static str, index: usize, count: usize },
    InvalidSkinSize { width: i32, height: i32 },
    FrameOutOfRange { frame: usize, count: usize },
}

impl fmt::Display for Md2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Md2Error::Truncated { needed, available } => {
                write!(f, "file truncated: need {needed} bytes, have {available}")
            }
            Md2Error::BadIdent(ident) => write!(f, "bad ident {ident:?}, expected \"IDP2\""),
            Md2Error::BadVersion(v) => write!(f, "unsupported version {v}, expected {MD2_VERSION}"),
            Md2Error::NegativeCount { what, count } => write!(f, "negative {what} count {count}"),
            Md2Error::LimitExceeded { what, count, limit } => {
                write!(f, "{count} {what} exceed the limit of {limit}")
            }
            Md2Error::SectionOutOfBounds {
                section,
                offset,
                size,
                len,
            } => write!(
                f,
                "{section} section at offset {offset} with {size} bytes exceeds file length {len}"
            ),
            Md2Error::InvalidFrameSize { expected, found } => {
                write!(f, "frame size {found} does not match the expected {expected}")
            }
            Md2Error::IndexOutOfRange { what, index, count } => {
                write!(f, "{what} index {index} out of range for {count} entries")
            }
            Md2Error::InvalidSkinSize { width, height } => {
                write!(f, "invalid skin size {width}x{height}")
            }
            Md2Error::FrameOutOfRange { frame, count } => {
                write!(f, "frame {frame} out of range for {count} frames")
            }
        }
    }
}

impl std::error::Error for Md2Error {}

/// The 17 little-endian `i32`s at the start of every MD2 file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Md2Header {
    pub ident: [u8; 4],
    pub version: i32,
    pub skin_width: i32,
    pub skin_height: i32,
    pub frame_size: i32,
    pub num_skins: i32,
    pub num_vertices: i32,
    pub num_st: i32,
    pub num_tris: i32,
    pub num_glcmds: i32,
    pub num_frames: i32,
    pub ofs_skins: i32,
    pub ofs_st: i32,
    pub ofs_tris: i32,
    pub ofs_frames: i32,
    pub ofs_glcmds: i32,
    pub ofs_end: i32,
}

impl Md2Header {
    pub fn parse(data: &[u8]) -> Result<Self, Md2Error> {
        if data.len() < HEADER_SIZE {
            return Err(Md2Error::Truncated {
                needed: HEADER_SIZE,
                available: data.len(),
            });
        }
        let mut ident = [0; 4];
        ident.copy_from_slice(&data[..4]);
        let field = |i: usize| read_i32(data, i * 4);
        let header = Self {
            ident,
            version: field(1),
            skin_width: field(2),
            skin_height: field(3),
            frame_size: field(4),
            num_skins: field(5),
            num_vertices: field(6),
            num_st: field(7),
            num_tris: field(8),
            num_glcmds: field(9),
            num_frames: field(10),
            ofs_skins: field(11),
            ofs_st: field(12),
            ofs_tris: field(13),
            ofs_frames: field(14),
            ofs_glcmds: field(15),
            ofs_end: field(16),
        };
        if header.ident != MD2_IDENT {
            return Err(Md2Error::BadIdent(header.ident));
        }
        if header.version != MD2_VERSION {
            return Err(Md2Error::BadVersion(header.version));
        }
        Ok(header)
    }
}

/// A triangle referring to one position and one texture coordinate per corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Md2Triangle {
    pub vertices: [u16; 3],
    pub texcoords: [u16; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Md2Frame {
    pub name: String,
    /// Decoded positions, already converted to Y-up.
    pub positions: Vec<Point3<f32>>,
}

/// Consecutive frames forming one named animation; `end` is inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationRange {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl AnimationRange {
    /// Number of frames; a range always holds at least one.
    pub fn frame_count(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Md2Model {
    pub skin_width: i32,
    pub skin_height: i32,
    pub skins: Vec<String>,
    /// Normalised texture coordinates.
    pub texcoords: Vec<[f32; 2]>,
    /// Counter-clockwise triangles.
    pub triangles: Vec<Md2Triangle>,
    pub frames: Vec<Md2Frame>,
    /// Unique (position, texcoord) pairs used by the triangles, in first use order.
    corners: Vec<(u16, u16)>,
    indices: Vec<u32>,
}

impl Md2Model {
    pub fn parse(data: &[u8]) -> Result<Self, Md2Error> {
        let header = Md2Header::parse(data)?;

        let num_skins = count("skin", header.num_skins, MAX_SKINS)?;
        let num_vertices = count("vertex", header.num_vertices, MAX_VERTICES)?;
        let num_st = count("texcoord", header.num_st, usize::MAX)?;
        let num_tris = count("triangle", header.num_tris, MAX_TRIANGLES)?;
        let num_frames = count("frame", header.num_frames, MAX_FRAMES)?;

        let frame_size = FRAME_HEADER_SIZE + FRAME_VERTEX_SIZE * num_vertices;
        if header.frame_size < 0 || header.frame_size as usize != frame_size {
            return Err(Md2Error::InvalidFrameSize {
                expected: frame_size,
                found: header.frame_size,
            });
        }
        if num_st > 0 && (header.skin_width <= 0 || header.skin_height <= 0) {
            return Err(Md2Error::InvalidSkinSize {
                width: header.skin_width,
                height: header.skin_height,
            });
        }

        let skins = section(data, "skins", header.ofs_skins, num_skins * SKIN_NAME_SIZE)?
            .chunks_exact(SKIN_NAME_SIZE)
            .map(c_string)
            .collect();

        let (sw, sh) = (header.skin_width as f32, header.skin_height as f32);
        let texcoords = section(data, "texcoords", header.ofs_st, num_st * TEXCOORD_SIZE)?
            .chunks_exact(TEXCOORD_SIZE)
            .map(|c| [read_i16(c, 0) as f32 / sw, read_i16(c, 2) as f32 / sh])
            .collect();

        let mut triangles = Vec::with_capacity(num_tris);
        for c in section(data, "triangles", header.ofs_tris, num_tris * TRIANGLE_SIZE)?
            .chunks_exact(TRIANGLE_SIZE)
        {
            let vertices = [read_u16(c, 0), read_u16(c, 2), read_u16(c, 4)];
            let texcoords = [read_u16(c, 6), read_u16(c, 8), read_u16(c, 10)];
            check_indices("vertex", &vertices, num_vertices)?;
            check_indices("texcoord", &texcoords, num_st)?;
            // Quake winds front faces clockwise.
            triangles.push(Md2Triangle {
                vertices: [vertices[0], vertices[2], vertices[1]],
                texcoords: [texcoords[0], texcoords[2], texcoords[1]],
            });
        }

        let frames = section(data, "frames", header.ofs_frames, num_frames * frame_size)?
            .chunks_exact(frame_size)
            .map(parse_frame)
            .collect();

        let mut corners = Vec::new();
        let mut lookup: HashMap<(u16, u16), u32> = HashMap::new();
        let mut indices = Vec::with_capacity(num_tris * 3);
        for tri in &triangles {
            for k in 0..3 {
                let key = (tri.vertices[k], tri.texcoords[k]);
                let index = *lookup.entry(key).or_insert_with(|| {
                    corners.push(key);
                    (corners.len() - 1) as u32
                });
                indices.push(index);
            }
        }

        log::debug!(
            "parsed MD2: {} vertices, {} triangles, {} frames, {} skins",
            num_vertices,
            num_tris,
            num_frames,
            num_skins
        );

        Ok(Self {
            skin_width: header.skin_width,
            skin_height: header.skin_height,
            skins,
            texcoords,
            triangles,
            frames,
            corners,
            indices,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Positions per frame.
    pub fn vertex_count(&self) -> usize {
        self.frames.first().map_or(0, |f| f.positions.len())
    }

    /// Vertices of every mesh built by [`mesh`](Self::mesh).
    pub fn mesh_vertex_count(&self) -> usize {
        self.corners.len()
    }

    /// Groups consecutive frames by name, ignoring trailing digits
    /// (`run1`, `run2`, ... form the animation `run`).
    pub fn animations(&self) -> Vec<AnimationRange> {
        let mut ranges: Vec<AnimationRange> = Vec::new();
        for (i, frame) in self.frames.iter().enumerate() {
            let name = frame.name.trim_end_matches(|c: char| c.is_ascii_digit());
            match ranges.last_mut() {
                Some(last) if last.name == name => last.end = i,
                _ => ranges.push(AnimationRange {
                    name: name.to_string(),
                    start: i,
                    end: i,
                }),
            }
        }
        ranges
    }

    pub fn animation(&self, name: &str) -> Option<AnimationRange> {
        self.animations().into_iter().find(|a| a.name == name)
    }

    /// Mesh between `frame_a` and `frame_b`; `t` is clamped to `0..=1`.
    pub fn mesh(&self, frame_a: usize, frame_b: usize, t: f32) -> Result<MeshData, Md2Error> {
        let a = self.frame(frame_a)?;
        let b = self.frame(frame_b)?;
        let t = t.clamp(0.0, 1.0);
        let vertices = self
            .corners
            .iter()
            .map(|&(v, st)| {
                let (pa, pb) = (a.positions[v as usize], b.positions[v as usize]);
                let position = pa + (pb - pa) * t;
                ModelVertex::new(
                    position.into(),
                    [0.0; 3],
                    self.texcoords[st as usize],
                )
            })
            .collect();
        let mut mesh = MeshData::new(vertices, self.indices.clone());
        mesh.compute_normals();
        mesh.compute_tangents();
        Ok(mesh)
    }

    fn frame(&self, frame: usize) -> Result<&Md2Frame, Md2Error> {
        self.frames.get(frame).ok_or(Md2Error::FrameOutOfRange {
            frame,
            count: self.frames.len(),
        })
    }
}

fn parse_frame(data: &[u8]) -> Md2Frame {
    let scale = [read_f32(data, 0), read_f32(data, 4), read_f32(data, 8)];
    let translate = [read_f32(data, 12), read_f32(data, 16), read_f32(data, 20)];
    let name = c_string(&data[24..24 + FRAME_NAME_SIZE]);
    let positions = data[FRAME_HEADER_SIZE..]
        .chunks_exact(FRAME_VERTEX_SIZE)
        .map(|v| {
            let [x, y, z] = [0, 1, 2].map(|k| v[k] as f32 * scale[k] + translate[k]);
            // Z-up to Y-up.
            Point3::new(x, z, -y)
        })
        .collect();
    Md2Frame { name, positions }
}

fn count(what: &'static str, value: i32, limit: usize) -> Result<usize, Md2Error> {
    if value < 0 {
        return Err(Md2Error::NegativeCount { what, count: value });
    }
    let value = value as usize;
    if value > limit {
        return Err(Md2Error::LimitExceeded {
            what,
            count: value,
            limit,
        });
    }
    Ok(value)
}

fn section<'a>(
    data: &'a [u8],
    name: &'static str,
    offset: i32,
    size: usize,
) -> Result<&'a [u8], Md2Error> {
    let out_of_bounds = Md2Error::SectionOutOfBounds {
        section: name,
        offset,
        size,
        len: data.len(),
    };
    if size == 0 {
        return Ok(&[]);
    }
    if offset < 0 {
        return Err(out_of_bounds);
    }
    let start = offset as usize;
    start
        .checked_add(size)
        .and_then(|end| data.get(start..end))
        .ok_or(out_of_bounds)
}

fn check_indices(what: &'static str, indices: &[u16; 3], count: usize) -> Result<(), Md2Error> {
    match indices.iter().find(|&&i| i as usize >= count) {
        Some(&index) => Err(Md2Error::IndexOutOfRange {
            what,
            index: index as usize,
            count,
        }),
        None => Ok(()),
    }
}

fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_f32(data: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_i16(data: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

impl Md2Frame {
    /// Centre of the frame's bounding box.
    pub fn center(&self) -> Point3<f32> {
        crate::collision::Aabb::from_points(&self.positions)
            .map_or(Point3::origin(), |b| b.center())
    }
}
