// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::hint::black_box;

use divan::Bencher;

use trace_encoding::{Decoder, Encoder, Event, EventType, Version};

fn main() {
    divan::main();
}

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

const EVENTS: usize = 4096;

fn event(kind: EventType, args: &[u64]) -> Event {
    Event {
        kind,
        args: args.to_vec(),
        ..Event::default()
    }
}

/// A scheduler-shaped session of pure inline events. No dictionary entries,
/// so a warm decode pass touches the allocator zero times; the allocation
/// column of `decode_steady_state` is the proof.
fn inline_session(events: usize) -> &'static [u8] {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.emit(&event(EventType::Frequency, &[1_000_000_000]))
        .unwrap();
    enc.emit(&event(EventType::Batch, &[0, 100])).unwrap();
    for i in 0..events as u64 {
        enc.emit(&event(EventType::GoStart, &[100 + i, i % 64, i]))
            .unwrap();
        enc.emit(&event(EventType::GoSched, &[101 + i, 0])).unwrap();
    }
    Vec::leak(buf)
}

/// A dictionary-heavy session: strings and four-word stacks dominate.
fn dictionary_session(entries: usize) -> &'static [u8] {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    for id in 1..=entries as u64 {
        let name = format!("runtime.fn{id}");
        enc.emit(&Event {
            kind: EventType::String,
            args: vec![id],
            data: name.into_bytes(),
            ..Event::default()
        })
        .unwrap();
        enc.emit(&event(
            EventType::Stack,
            &[id, 2, 0x1000 + id, id, id, 10, 0x2000 + id, id, id, 20],
        ))
        .unwrap();
    }
    Vec::leak(buf)
}

#[divan::bench]
fn decode_steady_state(bencher: Bencher) {
    let bytes = inline_session(EVENTS);
    let mut dec = Decoder::new(bytes);
    let mut evt = Event {
        args: Vec::with_capacity(512),
        data: Vec::with_capacity(4096),
        ..Event::default()
    };

    bencher.bench_local(move || {
        dec.reset(black_box(bytes));
        let mut count = 0u64;
        while dec.more() {
            if dec.decode(&mut evt).is_err() {
                break;
            }
            count += 1;
        }
        count
    });
}

#[divan::bench]
fn decode_dictionaries(bencher: Bencher) {
    let bytes = dictionary_session(512);

    bencher.bench_local(move || {
        let mut dec = Decoder::new(black_box(bytes));
        let mut evt = Event::new();
        while dec.more() {
            if dec.decode(&mut evt).is_err() {
                break;
            }
        }
        dec.trace().map(|trace| trace.count())
    });
}

#[divan::bench]
fn encode_session(bencher: Bencher) {
    let events: Vec<Event> = (0..EVENTS as u64)
        .map(|i| event(EventType::GoUnblock, &[100 + i, i % 64, i, 1]))
        .collect();
    let mut buf = Vec::with_capacity(EVENTS * 8);

    bencher.bench_local(move || {
        buf.clear();
        let mut enc = Encoder::new(&mut buf);
        for evt in black_box(&events) {
            enc.emit(evt).unwrap();
        }
        enc.offset()
    });
}

#[divan::bench(args = [Version::V1, Version::V5])]
fn decode_version(bencher: Bencher, version: Version) {
    // V1 bodies carry the extra leading sequence delta the normalizer strips.
    let bytes: &'static [u8] = {
        let mut buf = trace_encoding::header::encode(version).to_vec();
        for i in 0..EVENTS as u64 {
            let args: &[u64] = if version == Version::V1 {
                &[i, 100 + i, 1]
            } else {
                &[100 + i, 1]
            };
            let narg = args.len() as u8 - 1 - version.arg_offset() as u8;
            buf.push(EventType::GoSched as u8 | narg << 6);
            for &arg in args {
                trace_encoding::leb128::append(&mut buf, arg);
            }
        }
        Vec::leak(buf)
    };

    let mut dec = Decoder::new(bytes);
    let mut evt = Event::new();
    bencher.bench_local(move || {
        dec.reset(black_box(bytes));
        let mut count = 0u64;
        while dec.more() {
            if dec.decode(&mut evt).is_err() {
                break;
            }
            count += 1;
        }
        count
    });
}
