use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Screen <-> world conversion used for hit-testing and box selection.
pub trait Projector {
    /// World-space ray from the eye through a screen position (pixels, origin top-left).
    fn screen_ray(&self, screen: Vec2) -> Option<Ray>;
    /// Screen position of a world point, `None` when it is behind the eye.
    fn project_point(&self, point: Vec3) -> Option<Vec2>;
}

/// Perspective camera looking at the battlefield.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect = if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<Ray> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let clip = Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let inv_view_proj = self.view_projection(viewport).inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let dir = ((world.truncate() / world.w) - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        Some(Ray { origin: self.position, dir })
    }

    pub fn project_point(&self, point: Vec3, viewport: PhysicalSize<u32>) -> Option<Vec2> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let clip = self.view_projection(viewport) * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        Some(Vec2::new(x, y))
    }
}

/// A camera bound to the canvas size it renders into.
#[derive(Debug, Clone)]
pub struct ViewportCamera {
    pub camera: Camera3D,
    pub viewport: PhysicalSize<u32>,
}

impl ViewportCamera {
    pub fn new(camera: Camera3D, viewport: PhysicalSize<u32>) -> Self {
        Self { camera, viewport }
    }

    /// Top-down-ish battlefield view used when the host supplies no camera.
    pub fn overview(viewport: PhysicalSize<u32>) -> Self {
        let camera =
            Camera3D::new(Vec3::new(0.0, 30.0, 30.0), Vec3::ZERO, 45.0_f32.to_radians(), 0.1, 1000.0);
        Self::new(camera, viewport)
    }

    pub fn resize(&mut self, viewport: PhysicalSize<u32>) {
        self.viewport = viewport;
    }
}

impl Projector for ViewportCamera {
    fn screen_ray(&self, screen: Vec2) -> Option<Ray> {
        self.camera.screen_ray(screen, self.viewport)
    }

    fn project_point(&self, point: Vec3) -> Option<Vec2> {
        self.camera.project_point(point, self.viewport)
    }
}
