/*
 *  display/drivers/mock.rs
 *
 *  ili9488-spi - serial TFT driver
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock bus, delay and control lines for running without hardware
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::display::codec::{WireWord, WordCodec, WordMode};
use crate::display::error::TransportError;
use crate::display::traits::{BacklightLine, ResetLine, Transport};

/// One observable action on the mock hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    Command(u8),
    Data(u8),
    /// Milliseconds slept (settle delays and reset timing)
    Sleep(u32),
    Reset(bool),
    Backlight(bool),
}

/// A window opened with CASET/PASET/RAMWR and the data words that followed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTrace {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
    pub data: Vec<u8>,
}

impl WindowTrace {
    pub fn area(&self) -> usize {
        (self.x1 as usize - self.x0 as usize + 1) * (self.y1 as usize - self.y0 as usize + 1)
    }
}

/// Internal state for the mock hardware (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Everything delivered, in order
    pub events: Vec<MockEvent>,

    /// Word count of every successful send
    pub send_sizes: Vec<usize>,

    /// Number of send() attempts, failed ones included
    pub send_calls: usize,

    /// Data words delivered so far
    pub data_words: usize,

    /// Fail the Nth send() call (1-based)
    pub fail_on_send: Option<usize>,

    /// Fail the send() that would carry the Nth data word (1-based)
    pub fail_on_data_word: Option<usize>,

    pub backlight: Option<bool>,
}

/// Shared recorder behind every mock collaborator.
///
/// Clones see the same state, so a test can keep one handle while the
/// session owns the transport.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockBusState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn transport(&self, mode: WordMode) -> MockTransport {
        MockTransport { state: Arc::clone(&self.state), mode }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay { state: Arc::clone(&self.state) }
    }

    pub fn reset_line(&self) -> MockResetLine {
        MockResetLine { state: Arc::clone(&self.state) }
    }

    pub fn backlight(&self) -> MockBacklight {
        MockBacklight { state: Arc::clone(&self.state) }
    }

    pub fn fail_on_send(&self, call: usize) {
        self.lock().fail_on_send = Some(call);
    }

    pub fn fail_on_data_word(&self, word: usize) {
        let mut state = self.lock();
        state.fail_on_data_word = Some(state.data_words + word);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.fail_on_send = None;
        state.fail_on_data_word = None;
    }

    /// Forget recorded traffic (failure settings are kept)
    pub fn clear(&self) {
        let mut state = self.lock();
        state.events.clear();
        state.send_sizes.clear();
        state.send_calls = 0;
        state.data_words = 0;
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    pub fn commands(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Data(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn data_count(&self) -> usize {
        self.lock().data_words
    }

    pub fn send_sizes(&self) -> Vec<usize> {
        self.lock().send_sizes.clone()
    }

    pub fn send_calls(&self) -> usize {
        self.lock().send_calls
    }

    pub fn backlight_level(&self) -> Option<bool> {
        self.lock().backlight
    }

    /// Split the trace into RAMWR windows with the data that followed each
    pub fn windows(&self) -> Vec<WindowTrace> {
        let events = self.events();
        let mut windows = Vec::new();
        let mut i = 0;

        while i < events.len() {
            if events[i] != MockEvent::Command(0x2A) {
                i += 1;
                continue;
            }
            let params = |at: usize| -> Option<(u16, u16)> {
                let mut b = [0u8; 4];
                for (k, slot) in b.iter_mut().enumerate() {
                    match events.get(at + k) {
                        Some(MockEvent::Data(d)) => *slot = *d,
                        _ => return None,
                    }
                }
                Some((u16::from_be_bytes([b[0], b[1]]), u16::from_be_bytes([b[2], b[3]])))
            };
            let (Some((x0, x1)), Some(MockEvent::Command(0x2B))) = (params(i + 1), events.get(i + 5)) else {
                i += 1;
                continue;
            };
            let (Some((y0, y1)), Some(MockEvent::Command(0x2C))) = (params(i + 6), events.get(i + 10)) else {
                i += 1;
                continue;
            };

            let mut data = Vec::new();
            i += 11;
            while let Some(MockEvent::Data(d)) = events.get(i) {
                data.push(*d);
                i += 1;
            }
            windows.push(WindowTrace { x0, y0, x1, y1, data });
        }
        windows
    }
}

/// Transport that decodes and records every word it is given
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockBusState>>,
    mode: WordMode,
}

impl Transport for MockTransport {
    fn send(&mut self, words: &[WireWord]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.send_calls += 1;

        if state.fail_on_send == Some(state.send_calls) {
            return Err(TransportError::new(format!("simulated failure on send #{}", state.send_calls)));
        }

        let mut decoded = Vec::with_capacity(words.len());
        for word in words {
            let framed_ok = matches!(
                (self.mode, word),
                (WordMode::Native9, WireWord::Native(_)) | (WordMode::Emulated8, WireWord::Emulated(_))
            );
            if !framed_ok {
                return Err(TransportError::new(format!("{:?} word on {:?} bus", word, self.mode)));
            }
            decoded.push(WordCodec::decode(*word));
        }

        let data_in_call = decoded.iter().filter(|(is_data, _)| *is_data).count();
        if let Some(n) = state.fail_on_data_word {
            if n > state.data_words && n <= state.data_words + data_in_call {
                return Err(TransportError::new(format!("simulated failure on data word #{}", n)));
            }
        }

        state.data_words += data_in_call;
        state.send_sizes.push(words.len());
        state.events.extend(decoded.into_iter().map(|(is_data, b)| {
            if is_data { MockEvent::Data(b) } else { MockEvent::Command(b) }
        }));
        Ok(())
    }
}

/// Delay that records instead of sleeping
#[derive(Debug)]
pub struct MockDelay {
    state: Arc<Mutex<MockBusState>>,
}

impl MockDelay {
    fn record(&mut self, ms: u32) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.events.push(MockEvent::Sleep(ms));
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(ns / 1_000_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.record(us / 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(ms);
    }
}

#[derive(Debug)]
pub struct MockResetLine {
    state: Arc<Mutex<MockBusState>>,
}

impl ResetLine for MockResetLine {
    fn set(&mut self, active: bool) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.events.push(MockEvent::Reset(active));
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.events.push(MockEvent::Sleep(duration.as_millis() as u32));
    }
}

#[derive(Debug)]
pub struct MockBacklight {
    state: Arc<Mutex<MockBusState>>,
}

impl BacklightLine for MockBacklight {
    fn set(&mut self, on: bool) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.backlight = Some(on);
        state.events.push(MockEvent::Backlight(on));
        Ok(())
    }

    fn get(&self) -> Option<bool> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).backlight
    }
}
