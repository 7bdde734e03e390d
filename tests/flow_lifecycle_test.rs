#[cfg(feature = "integration-tests")]
use mini_api::{
    context::{Context, Settings},
    flow::{FlowConstructor, GraphicsFlow, ImageTestResult, Out, constructor, run_with},
    render::Render,
};

#[cfg(feature = "integration-tests")]
use crate::common::test_utils::State;

#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
enum Event {
    Test,
}

#[cfg(feature = "integration-tests")]
const GIVE_UP_AFTER: u32 = 600;

#[cfg(feature = "integration-tests")]
struct Lifecycle {
    received_event: bool,
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<State, Event> for Lifecycle {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
        ctx.clear_colour = wgpu::Color::TRANSPARENT;
        assert_eq!(state.frame_counter(), 0);
        assert_eq!(state.init_invocations(), 0);
        assert_eq!(state.update_invocations(), 0);

        state.init();
        Out::Empty
    }

    fn on_resize(&mut self, _: &Context, state: &mut State, width: u32, height: u32) -> Out<State, Event> {
        assert!(width > 0 && height > 0);
        state.resize();
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, state: &mut State, _: std::time::Duration) -> Out<State, Event> {
        assert_eq!(state.frame_counter(), state.update_invocations());
        assert_eq!(state.init_invocations(), 1);
        state.frame();
        state.update();

        let serve_sencha: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🍵');
        });
        let serve_mate: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🧉');
        });
        match state.frame_counter() {
            3 => Out::FutEvent(vec![Box::new(async move { Event::Test })]),
            5 => Out::FutFn(vec![
                Box::new(async move { serve_sencha }),
                Box::new(async move { serve_mate }),
            ]),
            _ => Out::Empty,
        }
    }

    fn on_custom_events(&mut self, _: &Context, state: &mut State, event: Event) -> Option<Event> {
        // Sent in frame 3.
        assert!(state.frame_counter() >= 3);
        match event {
            Event::Test => self.received_event = true,
        }
        None
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }

    fn render_to_texture(
        &self,
        _: &Context,
        state: &mut State,
        _: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        if state.frame_counter() > GIVE_UP_AFTER {
            return Ok(ImageTestResult::Failed);
        }
        if !self.received_event || state.dummy_state.len() < 8 {
            return Ok(ImageTestResult::Waiting);
        }
        assert!(state.dummy_state.contains('🍵'));
        assert!(state.dummy_state.contains('🧉'));
        // Both emojis are four bytes wide.
        assert_eq!(state.dummy_state.len(), 8, "{}", state.dummy_state);
        Ok(ImageTestResult::Passed)
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_drive_hooks_and_async_outputs() {
    let flow: FlowConstructor<State, Event> = constructor(|_| async move {
        Box::new(Lifecycle {
            received_event: false,
        }) as Box<dyn GraphicsFlow<_, _>>
    });

    if let Err(e) = run_with(Settings::titled("lifecycle test"), vec![flow]) {
        panic!("{}", e);
    }
}
