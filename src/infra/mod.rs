pub mod naver;
