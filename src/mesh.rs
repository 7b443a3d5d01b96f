//! GPU mesh geometry and the mesh/shader attribute contract.
//!
//! A [`Mesh`] exposes a map from [`VertexAttribute`] to a
//! [`VertexBufferDescription`] (one GPU buffer per attribute stream) plus a
//! single [`IndexBufferDescription`]. A shader program may be used with a
//! mesh only if the program's declared attribute set is a subset of the
//! mesh's attribute map — the renderer enforces this at draw time and
//! treats a violation as a fatal configuration error.
//!
//! CPU-side geometry lives in [`MeshData`], which is pure data: the
//! procedural generators in [`crate::geometry`] build `MeshData` without
//! touching the GPU, and [`Mesh::from_data`] uploads it once during scene
//! construction.

use crate::gpu::GpuContext;
use crate::shader::VertexAttribute;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use wgpu::util::DeviceExt;

/// Opaque identity of a mesh, used as a pipeline-cache key component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

fn next_mesh_id() -> MeshId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    MeshId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// One vertex attribute stream: a GPU buffer plus its layout description.
#[derive(Debug)]
pub struct VertexBufferDescription {
    /// The GPU buffer holding this attribute's data.
    pub buffer: wgpu::Buffer,
    /// Components per vertex (3 for positions/normals, 2 for UVs).
    pub components: u32,
    /// The wgpu vertex format of one element.
    pub format: wgpu::VertexFormat,
    /// Byte distance between consecutive vertices.
    pub stride: u64,
    /// Byte offset of the first element.
    pub offset: u64,
}

/// The mesh's index stream.
#[derive(Debug)]
pub struct IndexBufferDescription {
    /// The GPU buffer holding index data.
    pub buffer: wgpu::Buffer,
    /// Index element format.
    pub format: wgpu::IndexFormat,
    /// Number of indices to draw.
    pub count: u32,
    /// Byte offset of the first index.
    pub offset: u64,
    /// Primitive topology the indices describe.
    pub topology: wgpu::PrimitiveTopology,
}

/// CPU-side mesh data, one stream per attribute.
///
/// `positions` and `indices` are mandatory; the other streams are present
/// only when the geometry carries them. Streams that are present must have
/// one element per position.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    /// Object-space positions.
    pub positions: Vec<[f32; 3]>,
    /// Object-space normals, if the geometry is lit.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Per-vertex colors, if any.
    pub colors: Option<Vec<[f32; 3]>>,
    /// First UV set, if the geometry is textured.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// Triangle-list indices.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// The attribute streams this data carries.
    pub fn attributes(&self) -> Vec<VertexAttribute> {
        let mut attrs = vec![VertexAttribute::Position];
        if self.normals.is_some() {
            attrs.push(VertexAttribute::Normal);
        }
        if self.colors.is_some() {
            attrs.push(VertexAttribute::Color);
        }
        if self.tex_coords.is_some() {
            attrs.push(VertexAttribute::TexCoord0);
        }
        attrs
    }
}

/// GPU-resident mesh geometry. Immutable after creation.
#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    attributes: HashMap<VertexAttribute, VertexBufferDescription>,
    index: IndexBufferDescription,
}

impl Mesh {
    /// Uploads `data` to the GPU, one vertex buffer per attribute stream
    /// plus an index buffer.
    pub fn from_data(gpu: &GpuContext, data: &MeshData, label: &str) -> Rc<Self> {
        let mut attributes = HashMap::new();

        attributes.insert(
            VertexAttribute::Position,
            upload_stream_3(gpu, &data.positions, &format!("{} Positions", label)),
        );
        if let Some(normals) = &data.normals {
            attributes.insert(
                VertexAttribute::Normal,
                upload_stream_3(gpu, normals, &format!("{} Normals", label)),
            );
        }
        if let Some(colors) = &data.colors {
            attributes.insert(
                VertexAttribute::Color,
                upload_stream_3(gpu, colors, &format!("{} Colors", label)),
            );
        }
        if let Some(tex_coords) = &data.tex_coords {
            attributes.insert(
                VertexAttribute::TexCoord0,
                upload_stream_2(gpu, tex_coords, &format!("{} TexCoords", label)),
            );
        }

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Indices", label)),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Rc::new(Self {
            id: next_mesh_id(),
            attributes,
            index: IndexBufferDescription {
                buffer: index_buffer,
                format: wgpu::IndexFormat::Uint32,
                count: data.indices.len() as u32,
                offset: 0,
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        })
    }

    /// The mesh's stable identity.
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Looks up the stream for an attribute, if the mesh carries it.
    pub fn attribute(&self, attribute: VertexAttribute) -> Option<&VertexBufferDescription> {
        self.attributes.get(&attribute)
    }

    /// The attributes this mesh carries.
    pub fn available_attributes(&self) -> impl Iterator<Item = VertexAttribute> + '_ {
        self.attributes.keys().copied()
    }

    /// The index stream.
    pub fn index(&self) -> &IndexBufferDescription {
        &self.index
    }
}

fn upload_stream_3(gpu: &GpuContext, data: &[[f32; 3]], label: &str) -> VertexBufferDescription {
    VertexBufferDescription {
        buffer: gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            }),
        components: 3,
        format: wgpu::VertexFormat::Float32x3,
        stride: 12,
        offset: 0,
    }
}

fn upload_stream_2(gpu: &GpuContext, data: &[[f32; 2]], label: &str) -> VertexBufferDescription {
    VertexBufferDescription {
        buffer: gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            }),
        components: 2,
        format: wgpu::VertexFormat::Float32x2,
        stride: 8,
        offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_reports_carried_attributes() {
        let data = MeshData {
            positions: vec![[0.0; 3]; 3],
            normals: Some(vec![[0.0, 1.0, 0.0]; 3]),
            colors: None,
            tex_coords: Some(vec![[0.0; 2]; 3]),
            indices: vec![0, 1, 2],
        };

        let attrs = data.attributes();
        assert!(attrs.contains(&VertexAttribute::Position));
        assert!(attrs.contains(&VertexAttribute::Normal));
        assert!(attrs.contains(&VertexAttribute::TexCoord0));
        assert!(!attrs.contains(&VertexAttribute::Color));
        assert_eq!(data.vertex_count(), 3);
    }
}
