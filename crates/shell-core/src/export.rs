//! STL and report export

use std::path::{Path, PathBuf};

use serde::Serialize;
use shell_cad::{CadKernel, TessellatedMesh};

use crate::document::{Document, DocumentObject};

/// Convert a tessellated mesh to STL triangles
pub fn mesh_to_triangles(mesh: &TessellatedMesh) -> Vec<stl_io::Triangle> {
    let mut triangles = Vec::with_capacity(mesh.triangle_count());
    for chunk in mesh.indices.chunks(3) {
        if chunk.len() != 3 {
            continue;
        }

        let v0 = mesh.vertices[chunk[0] as usize];
        let v1 = mesh.vertices[chunk[1] as usize];
        let v2 = mesh.vertices[chunk[2] as usize];

        // Facet normal from the winding
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let cross = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        let len = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        let normal = if len > 0.0 {
            [cross[0] / len, cross[1] / len, cross[2] / len]
        } else {
            [0.0, 0.0, 1.0]
        };

        triangles.push(stl_io::Triangle {
            normal: stl_io::Normal::new(normal),
            vertices: [
                stl_io::Vertex::new(v0),
                stl_io::Vertex::new(v1),
                stl_io::Vertex::new(v2),
            ],
        });
    }
    triangles
}

/// Tessellate a document object and write it as binary STL. Returns the
/// number of triangles written.
pub fn save_stl(
    kernel: &dyn CadKernel,
    object: &DocumentObject,
    path: impl AsRef<Path>,
    resolution: f64,
) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let mesh = kernel
        .tessellate(&object.solid, resolution)
        .map_err(|e| ExportError::Mesh(format!("{}: {}", object.name, e)))?;
    if mesh.is_empty() {
        return Err(ExportError::Mesh(format!("{} has no surface", object.name)));
    }

    let triangles = mesh_to_triangles(&mesh);
    let mut file = std::fs::File::create(path).map_err(|e| ExportError::Io(e.to_string()))?;
    stl_io::write_stl(&mut file, triangles.iter()).map_err(|e| ExportError::Write(e.to_string()))?;

    tracing::info!(
        "Wrote {} ({} triangles)",
        path.display(),
        triangles.len()
    );
    Ok(triangles.len())
}

/// Write every visible object of `doc` to `<dir>/<name>.stl`
pub fn export_visible(
    kernel: &dyn CadKernel,
    doc: &Document,
    dir: impl AsRef<Path>,
    resolution: f64,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io(e.to_string()))?;

    let mut written = Vec::new();
    for object in doc.visible() {
        let path = dir.join(format!("{}.stl", object.name));
        save_stl(kernel, object, &path, resolution)?;
        written.push(path);
    }
    Ok(written)
}

/// Write a serializable report as pretty JSON
pub fn write_report<T: Serialize>(report: &T, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let json =
        serde_json::to_string_pretty(report).map_err(|e| ExportError::Serialize(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ExportError::Io(e.to_string()))?;
    Ok(())
}

/// Export errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Mesh error: {0}")]
    Mesh(String),
    #[error("Write error: {0}")]
    Write(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use shell_cad::{CsgKernel, Solid};
    use uuid::Uuid;

    #[test]
    fn test_triangle_normals() {
        let mesh = TessellatedMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        };
        let triangles = mesh_to_triangles(&mesh);
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].normal[2], 1.0);
    }

    #[test]
    fn test_export_visible_objects() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = CsgKernel::new();
        let cube = kernel
            .create_box(DVec3::ZERO, DVec3::new(4.0, 4.0, 4.0))
            .unwrap();

        let mut doc = Document::new("Test");
        doc.add("Cube", cube.clone());
        doc.add("Hidden", cube).visible = false;

        let written = export_visible(&kernel, &doc, dir.path(), 1.0).unwrap();
        assert_eq!(written, vec![dir.path().join("Cube.stl")]);
        assert!(!dir.path().join("Hidden.stl").exists());

        let mut file = std::fs::File::open(&written[0]).unwrap();
        let stl = stl_io::read_stl(&mut file).unwrap();
        assert!(!stl.faces.is_empty());
        let max_x = stl
            .vertices
            .iter()
            .map(|v| v[0])
            .fold(f32::MIN, f32::max);
        assert!((max_x - 4.0).abs() < 0.5);
    }

    #[test]
    fn test_export_unknown_solid_fails() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = CsgKernel::new();
        let object = DocumentObject {
            name: "Ghost".to_string(),
            solid: Solid::new(Uuid::new_v4()),
            visible: true,
            placement: DVec3::ZERO,
        };
        let result = save_stl(&kernel, &object, dir.path().join("ghost.stl"), 1.0);
        assert!(matches!(result, Err(ExportError::Mesh(_))));
    }

    #[test]
    fn test_write_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&vec![1, 2, 3], &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }
}
