use joko_core::serde_glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::texture::TextureHandle;

/// A corner in pixel space, origin at the top left of the viewport.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize)]
pub struct ScreenVertex {
    pub position: Vec2,
    pub texture_coordinates: Vec2,
    /// rgba, alpha already multiplied by every opacity factor
    pub color: [u8; 4],
}

impl ScreenVertex {
    pub fn new(position: glam::Vec2, texture_coordinates: glam::Vec2, color: [u8; 4]) -> Self {
        Self {
            position: position.into(),
            texture_coordinates: texture_coordinates.into(),
            color,
        }
    }
}

/// Four corners in drawing order. Without a texture the quad is filled with the vertex color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadObject {
    pub vertices: [ScreenVertex; 4],
    pub texture: Option<TextureHandle>,
}

/// The shape drawn for a marker whose icon is not available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleObject {
    pub center: Vec2,
    pub radius: f32,
    pub fill: [u8; 4],
    pub border: [u8; 4],
    pub border_thickness: f32,
    pub segments: u32,
}

/// One draw call for the host. The list of a frame must be submitted in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawPrimitive {
    Quad(QuadObject),
    Circle(CircleObject),
}

impl DrawPrimitive {
    /// Pixel position of the first vertex or of the center, handy to compare primitives.
    pub fn anchor(&self) -> glam::Vec2 {
        match self {
            DrawPrimitive::Quad(quad) => {
                let sum = quad
                    .vertices
                    .iter()
                    .fold(glam::Vec2::ZERO, |acc, v| acc + v.position.0);
                sum / 4.0
            }
            DrawPrimitive::Circle(circle) => circle.center.0,
        }
    }
}
