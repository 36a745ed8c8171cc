use super::CameraState;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Units per second at camera speed 1.
const MOVE_SPEED: f32 = 5.0;
/// Degrees per pixel of mouse drag.
const LOOK_SPEED: f32 = 0.2;
const PAN_SPEED: f32 = 0.02;

/// Handles camera input: mouse look, pan, wheel dolly and WASD movement
pub struct CameraController {
    state: CameraState,
    pub speed: f32,
    left_mouse_pressed: bool,
    middle_mouse_pressed: bool,
    right_mouse_pressed: bool,
    alt_pressed: bool,
    shift_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl CameraController {
    pub fn new(state: CameraState, speed: f32) -> Self {
        Self {
            state,
            speed,
            left_mouse_pressed: false,
            middle_mouse_pressed: false,
            right_mouse_pressed: false,
            alt_pressed: false,
            shift_pressed: false,
            last_mouse_pos: None,
            forward: false,
            back: false,
            left: false,
            right: false,
            up: false,
            down: false,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CameraState {
        &mut self.state
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left_mouse_pressed = pressed,
            MouseButton::Middle => self.middle_mouse_pressed = pressed,
            MouseButton::Right => self.right_mouse_pressed = pressed,
            _ => return,
        }
        if !pressed {
            self.last_mouse_pos = None;
        }
    }

    pub fn on_modifiers(&mut self, shift: bool, alt: bool) {
        self.shift_pressed = shift;
        self.alt_pressed = alt;
    }

    /// Returns true when a movement key changed state.
    pub fn on_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let flag = match key {
            KeyCode::KeyW | KeyCode::ArrowUp => &mut self.forward,
            KeyCode::KeyS | KeyCode::ArrowDown => &mut self.back,
            KeyCode::KeyA | KeyCode::ArrowLeft => &mut self.left,
            KeyCode::KeyD | KeyCode::ArrowRight => &mut self.right,
            KeyCode::KeyE | KeyCode::PageUp => &mut self.up,
            KeyCode::KeyQ | KeyCode::PageDown => &mut self.down,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    /// Mouse look with the right button (or Alt + left), pan with the middle
    /// button (or Shift + right).
    pub fn on_mouse_move(&mut self, position: (f64, f64)) -> bool {
        let should_pan =
            self.middle_mouse_pressed || (self.shift_pressed && self.right_mouse_pressed);
        let should_rotate =
            self.right_mouse_pressed || (self.alt_pressed && self.left_mouse_pressed);

        if !should_pan && !should_rotate {
            self.last_mouse_pos = None;
            return false;
        }

        let handled = match self.last_mouse_pos {
            Some(last) => {
                let dx = (position.0 - last.0) as f32;
                let dy = (position.1 - last.1) as f32;
                if should_pan {
                    self.pan(dx, -dy);
                } else {
                    self.rotate(dx, dy);
                }
                true
            }
            None => false,
        };
        self.last_mouse_pos = Some(position);
        handled
    }

    fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.state.yaw = (self.state.yaw + delta_x * LOOK_SPEED).rem_euclid(360.0);
        self.state.pitch = (self.state.pitch - delta_y * LOOK_SPEED).clamp(-89.0, 89.0);
    }

    fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let right = self.state.right();
        let scale = PAN_SPEED * self.speed.max(0.1);
        for i in 0..3 {
            self.state.position[i] -= right[i] * delta_x * scale;
        }
        self.state.position[1] -= delta_y * scale;
    }

    /// Wheel or pinch: move along the view direction.
    pub fn on_scroll(&mut self, delta: f32) {
        let forward = self.state.forward();
        let step = delta * self.speed.max(0.1);
        for i in 0..3 {
            self.state.position[i] += forward[i] * step;
        }
    }

    /// Applies held movement keys for `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        let forward = axis(self.forward, self.back);
        let strafe = axis(self.right, self.left);
        let lift = axis(self.up, self.down);
        if forward == 0.0 && strafe == 0.0 && lift == 0.0 {
            return;
        }

        let boost = if self.shift_pressed { 3.0 } else { 1.0 };
        let step = MOVE_SPEED * self.speed * boost * dt;
        let f = self.state.forward();
        let r = self.state.right();
        for i in 0..3 {
            self.state.position[i] += (f[i] * forward + r[i] * strafe) * step;
        }
        self.state.position[1] += lift * step;
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.last_mouse_pos = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn forward_key_moves_along_view() {
        let mut c = CameraController::new(CameraState::default(), 1.0);
        assert!(c.on_key(KeyCode::KeyW, true));
        c.update(1.0);
        let p = c.state().position;
        assert!((p[0] - (-20.0 + MOVE_SPEED)).abs() < EPSILON);
        assert!((p[2]).abs() < EPSILON);
    }

    #[test]
    fn released_keys_stop_motion() {
        let mut c = CameraController::new(CameraState::default(), 1.0);
        c.on_key(KeyCode::KeyD, true);
        c.on_key(KeyCode::KeyD, false);
        c.update(1.0);
        assert_eq!(c.state().position, [-20.0, 4.0, 0.0]);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut c = CameraController::new(CameraState::default(), 1.0);
        c.on_mouse_button(MouseButton::Right, true);
        c.on_mouse_move((0.0, 0.0));
        c.on_mouse_move((0.0, -10_000.0));
        assert!((c.state().pitch - 89.0).abs() < EPSILON);
    }
}
