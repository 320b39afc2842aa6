// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    toggle_press_ready = { InteractionMode::Toggle, Phase::Ready, Edge::Pressed, true, ToggleCommand::Start },
    toggle_press_recording = { InteractionMode::Toggle, Phase::Recording, Edge::Pressed, true, ToggleCommand::Stop },
    toggle_press_arming = { InteractionMode::Toggle, Phase::Arming, Edge::Pressed, false, ToggleCommand::CancelArming },
    toggle_release_is_ignored = { InteractionMode::Toggle, Phase::Recording, Edge::Released, true, ToggleCommand::None },
    toggle_press_processing = { InteractionMode::Toggle, Phase::Processing, Edge::Pressed, false, ToggleCommand::None },
    toggle_press_degraded = { InteractionMode::Toggle, Phase::Degraded, Edge::Pressed, false, ToggleCommand::None },
    hold_press_ready = { InteractionMode::Hold, Phase::Ready, Edge::Pressed, false, ToggleCommand::Start },
    hold_release_recording = { InteractionMode::Hold, Phase::Recording, Edge::Released, true, ToggleCommand::Stop },
    hold_release_before_frames = { InteractionMode::Hold, Phase::Recording, Edge::Released, false, ToggleCommand::CancelArming },
    hold_release_arming = { InteractionMode::Hold, Phase::Arming, Edge::Released, false, ToggleCommand::CancelArming },
    hold_press_recording = { InteractionMode::Hold, Phase::Recording, Edge::Pressed, true, ToggleCommand::None },
)]
fn routing_table(
    interaction: InteractionMode,
    phase: Phase,
    edge: Edge,
    is_recording: bool,
    expected: ToggleCommand,
) {
    assert_eq!(route_toggle(interaction, phase, edge, is_recording), expected);
}
