//! Named registry of generated shapes

use glam::DVec3;
use shell_cad::Solid;

/// A shape in the document
#[derive(Debug, Clone)]
pub struct DocumentObject {
    pub name: String,
    pub solid: Solid,
    pub visible: bool,
    /// Display offset, not applied to exported geometry
    pub placement: DVec3,
}

/// Ordered collection of named shapes
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub name: String,
    objects: Vec<DocumentObject>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Add a shape, replacing any object with the same name
    pub fn add(&mut self, name: impl Into<String>, solid: Solid) -> &mut DocumentObject {
        let name = name.into();
        let object = DocumentObject {
            name: name.clone(),
            solid,
            visible: true,
            placement: DVec3::ZERO,
        };
        let index = match self.objects.iter().position(|o| o.name == name) {
            Some(i) => {
                self.objects[i] = object;
                i
            }
            None => {
                self.objects.push(object);
                self.objects.len() - 1
            }
        };
        &mut self.objects[index]
    }

    pub fn get(&self, name: &str) -> Option<&DocumentObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn objects(&self) -> &[DocumentObject] {
        &self.objects
    }

    pub fn visible(&self) -> impl Iterator<Item = &DocumentObject> {
        self.objects.iter().filter(|o| o.visible)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
