// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Determinism of descriptor evaluation, storage bound acceptance and subnet
//! allocation over arbitrary networks.

mod descriptor_properties;
