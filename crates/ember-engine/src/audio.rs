//! Sound emitter component.
//!
//! Playback belongs to the host's audio collaborator. An [`AudioSource`] only
//! queues [`AudioRequest`]s, which the host collects after each callback via
//! [`Scene::take_audio_requests`](crate::scene::Scene::take_audio_requests).

use ember_ecs::component::{Capability, Component, ComponentContext, ComponentResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AudioRequest {
    Play { clip: String, volume: f32, looping: bool },
    Stop { clip: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub clip: String,
    pub volume: f32,
    pub looping: bool,
    pub play_on_start: bool,
    requests: Vec<AudioRequest>,
}

impl AudioSource {
    pub fn new(clip: &str) -> Self {
        Self {
            clip: clip.to_owned(),
            volume: 1.0,
            looping: false,
            play_on_start: false,
            requests: Vec::new(),
        }
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn autoplay(mut self) -> Self {
        self.play_on_start = true;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn play(&mut self) {
        self.requests.push(AudioRequest::Play {
            clip: self.clip.clone(),
            volume: self.volume,
            looping: self.looping,
        });
    }

    pub fn stop(&mut self) {
        self.requests.push(AudioRequest::Stop {
            clip: self.clip.clone(),
        });
    }

    pub fn take_requests(&mut self) -> Vec<AudioRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn pending(&self) -> &[AudioRequest] {
        &self.requests
    }
}

impl Component for AudioSource {
    fn type_name(&self) -> &'static str {
        "AudioSource"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Audio]
    }

    fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> ComponentResult {
        if self.play_on_start {
            self.play();
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        name: &str,
        _data: &serde_json::Value,
    ) -> ComponentResult {
        match name {
            "play_sound" => self.play(),
            "stop_sound" => self.stop(),
            _ => {}
        }
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) -> ComponentResult {
        if self.looping {
            self.stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ecs::object::GameObject;

    #[test]
    fn autoplay_queues_on_start() {
        let mut obj = GameObject::new("music");
        obj.add_component(AudioSource::new("theme.ogg").looping().autoplay());
        assert!(obj.get_component::<AudioSource>().unwrap().pending().is_empty());
        obj.start();

        let source = obj.get_component_mut::<AudioSource>().unwrap();
        assert_eq!(
            source.take_requests(),
            vec![AudioRequest::Play {
                clip: "theme.ogg".to_owned(),
                volume: 1.0,
                looping: true
            }]
        );
        assert!(source.pending().is_empty());
    }

    #[test]
    fn messages_drive_playback() {
        let mut obj = GameObject::new("coin");
        obj.add_component(AudioSource::new("ding.wav").with_volume(3.0));
        obj.send_message("play_sound", &serde_json::Value::Null);
        obj.send_message("stop_sound", &serde_json::Value::Null);
        let source = obj.get_component::<AudioSource>().unwrap();
        assert_eq!(source.pending().len(), 2);
        assert_eq!(source.volume, 1.0);
    }
}
