// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Generated protobuf/gRPC types for the replica RPC surface (§6).
//!
//! Hand-written conversions to and from [`nrt_types`](../nrt_types/index.html)
//! live in `nrt-client`, which is the only crate that needs to know both
//! vocabularies.

tonic::include_proto!("nrt.replica");
