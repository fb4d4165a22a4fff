//! Naver Land (new.land.naver.com) listing API.

mod client;

pub use client::NaverLandClient;
